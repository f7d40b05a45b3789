//! Domain registration age lookup (RDAP).
//!
//! The pipeline only needs one fact from registration data: how many days
//! old the domain is. The lookup is a capability trait so tests and
//! alternative data sources can stand in for the network; the default
//! provider queries the public RDAP aggregator.
//!
//! Lookups fail open: an unknown age is reported as `None` and never flags a
//! domain by itself (unsupported TLDs and flaky registries would otherwise
//! produce false positives).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PROBE_TIMEOUT;

/// Default RDAP aggregator endpoint.
const RDAP_ENDPOINT: &str = "https://rdap.org/domain";

/// Capability: resolve a domain's registration age in days.
#[async_trait]
pub trait AgeLookup: Send + Sync {
    /// Returns the domain age in days, or `None` when unknown.
    async fn lookup_age(&self, domain: &str) -> Option<i64>;
}

/// Age findings for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeReport {
    /// Age in days; `None` when the lookup failed or the TLD is unsupported.
    pub age_days: Option<i64>,
    /// Age is known and below the configured minimum.
    pub is_new_domain: bool,
    /// Human-readable reasons for fired checks.
    pub reasons: Vec<String>,
}

/// Marks a domain as new when its age is known and below `min_age_days`.
pub fn analyze_domain_age(age_days: Option<i64>, min_age_days: i64) -> AgeReport {
    let mut report = AgeReport {
        age_days,
        is_new_domain: false,
        reasons: Vec::new(),
    };

    if let Some(days) = age_days {
        if days < min_age_days {
            report.is_new_domain = true;
            report
                .reasons
                .push(format!("Domain is very new ({days} days old)"));
        }
    }

    report
}

/// RDAP-backed [`AgeLookup`] implementation.
pub struct RdapAgeLookup {
    client: Arc<reqwest::Client>,
    endpoint: String,
}

impl RdapAgeLookup {
    /// Creates a lookup against the public RDAP aggregator.
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        Self {
            client,
            endpoint: RDAP_ENDPOINT.to_string(),
        }
    }

    /// Overrides the RDAP endpoint (used by tests).
    pub fn with_endpoint(client: Arc<reqwest::Client>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch_registration_date(&self, domain: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let url = format!("{}/{domain}", self.endpoint);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        let registration = body
            .get("events")
            .and_then(|events| events.as_array())
            .and_then(|events| {
                events.iter().find(|event| {
                    event.get("eventAction").and_then(|a| a.as_str()) == Some("registration")
                })
            })
            .and_then(|event| event.get("eventDate"))
            .and_then(|date| date.as_str())
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map(|date| date.with_timezone(&Utc));

        Ok(registration)
    }
}

#[async_trait]
impl AgeLookup for RdapAgeLookup {
    async fn lookup_age(&self, domain: &str) -> Option<i64> {
        let lookup = tokio::time::timeout(PROBE_TIMEOUT, self.fetch_registration_date(domain));
        match lookup.await {
            Ok(Ok(Some(created))) => {
                let age = (Utc::now() - created).num_days();
                log::debug!("RDAP: {domain} registered {age} days ago");
                Some(age)
            }
            Ok(Ok(None)) => {
                log::debug!("RDAP: no registration event for {domain}");
                None
            }
            Ok(Err(e)) => {
                log::warn!("RDAP lookup failed for {domain}: {e}");
                None
            }
            Err(_) => {
                log::warn!("RDAP lookup timed out for {domain}");
                None
            }
        }
    }
}
