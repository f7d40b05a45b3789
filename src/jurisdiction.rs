//! Hosting-jurisdiction analysis over a redirect chain.
//!
//! Each unique domain in the chain is geolocated and the distinct hosting
//! countries counted. Legitimate redirects rarely hop across more than two
//! countries; phishing kits bounce through cheap hosting in several. A
//! failed lookup counts as the "Unknown" country so that unresolvable hops
//! still register as jurisdiction changes.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::geoip::GeoLookup;
use crate::models::RiskTier;

/// Distinct-country count above which the chain is high risk.
const HIGH_RISK_JURISDICTIONS: usize = 2;

/// Jurisdiction findings over one redirect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionReport {
    /// Number of distinct hosting countries across the chain.
    pub jurisdiction_count: usize,
    /// Distinct countries in first-seen order.
    pub countries: Vec<String>,
    /// The chain rendered as `a -> b -> c`.
    pub path: String,
    /// Risk tier derived from the country count.
    pub jump_risk: RiskTier,
    /// Country hosting the first URL in the chain.
    pub primary_origin: Option<String>,
    /// Country count exceeds the configured jump limit.
    pub exceeds_limit: bool,
    /// Human-readable reasons for fired checks.
    pub reasons: Vec<String>,
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Geolocates every unique domain in the chain and scores the hops.
///
/// `jump_limit` is the separately configurable ceiling on distinct
/// countries; it fires independently of the high-risk tier.
pub async fn analyze_jurisdictions(
    chain: &[String],
    geo: &dyn GeoLookup,
    jump_limit: usize,
) -> JurisdictionReport {
    let mut domains: Vec<String> = Vec::new();
    for url in chain {
        if let Some(host) = host_of(url) {
            if !domains.contains(&host) {
                domains.push(host);
            }
        }
    }

    let mut countries: Vec<String> = Vec::new();
    let mut primary_origin = None;
    for (i, domain) in domains.iter().enumerate() {
        let country = match geo.lookup(domain).await {
            Some(info) => info.country,
            None => "Unknown".to_string(),
        };
        if i == 0 {
            primary_origin = Some(country.clone());
        }
        if !countries.contains(&country) {
            countries.push(country);
        }
    }

    let jurisdiction_count = countries.len();
    let jump_risk = if jurisdiction_count > HIGH_RISK_JURISDICTIONS {
        RiskTier::High
    } else {
        RiskTier::Low
    };

    let mut reasons = Vec::new();
    if jump_risk == RiskTier::High {
        reasons.push(format!(
            "Redirect chain crosses {} jurisdictions ({})",
            jurisdiction_count,
            countries.join(", ")
        ));
    }
    let exceeds_limit = jurisdiction_count > jump_limit;
    if exceeds_limit {
        reasons.push(format!(
            "Jurisdiction jump limit exceeded ({jurisdiction_count} > {jump_limit})"
        ));
    }

    JurisdictionReport {
        jurisdiction_count,
        countries,
        path: chain.join(" -> "),
        jump_risk,
        primary_origin,
        exceeds_limit,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::GeoInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapLookup(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl GeoLookup for MapLookup {
        async fn lookup(&self, domain: &str) -> Option<GeoInfo> {
            self.0.get(domain).map(|country| GeoInfo {
                ip: "203.0.113.1".to_string(),
                country: country.to_string(),
                city: "Unknown".to_string(),
                isp: "Unknown".to_string(),
            })
        }
    }

    fn chain(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_single_country_is_low_risk() {
        let geo = MapLookup(HashMap::from([("a.com", "United States")]));
        let report =
            analyze_jurisdictions(&chain(&["http://a.com/", "http://a.com/login"]), &geo, 3)
                .await;
        assert_eq!(report.jurisdiction_count, 1);
        assert_eq!(report.jump_risk, RiskTier::Low);
        assert!(report.reasons.is_empty());
        assert_eq!(report.primary_origin.as_deref(), Some("United States"));
    }

    #[tokio::test]
    async fn test_three_countries_is_high_risk() {
        let geo = MapLookup(HashMap::from([
            ("a.com", "United States"),
            ("b.ru", "Russia"),
            ("c.cn", "China"),
        ]));
        let report = analyze_jurisdictions(
            &chain(&["http://a.com/", "http://b.ru/", "http://c.cn/"]),
            &geo,
            3,
        )
        .await;
        assert_eq!(report.jurisdiction_count, 3);
        assert_eq!(report.jump_risk, RiskTier::High);
        assert!(!report.exceeds_limit);
        assert_eq!(report.reasons.len(), 1);
        assert!(report.reasons[0].contains("3 jurisdictions"));
    }

    #[tokio::test]
    async fn test_jump_limit_fires_independently() {
        let geo = MapLookup(HashMap::from([
            ("a.com", "United States"),
            ("b.ru", "Russia"),
            ("c.cn", "China"),
        ]));
        let report = analyze_jurisdictions(
            &chain(&["http://a.com/", "http://b.ru/", "http://c.cn/"]),
            &geo,
            2,
        )
        .await;
        assert!(report.exceeds_limit);
        assert_eq!(report.reasons.len(), 2);
        assert!(report.reasons[1].contains("3 > 2"));
    }

    #[tokio::test]
    async fn test_failed_lookup_counts_as_unknown() {
        let geo = MapLookup(HashMap::from([("a.com", "Germany")]));
        let report = analyze_jurisdictions(
            &chain(&["http://a.com/", "http://unresolvable.invalid/"]),
            &geo,
            3,
        )
        .await;
        assert_eq!(report.countries, vec!["Germany", "Unknown"]);
        assert_eq!(report.jurisdiction_count, 2);
        assert_eq!(report.jump_risk, RiskTier::Low);
    }

    #[tokio::test]
    async fn test_path_rendering() {
        let geo = MapLookup(HashMap::new());
        let report =
            analyze_jurisdictions(&chain(&["http://a.com/", "http://b.com/"]), &geo, 3).await;
        assert_eq!(report.path, "http://a.com/ -> http://b.com/");
    }
}
