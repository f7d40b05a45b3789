//! Domain reputation scoring.
//!
//! Combines the TLD risk list, domain age, hosting ISP and lexical
//! composition into an additive 0-100 risk score. Each vector contributes a
//! fixed amount; the scorer never reaches out to the network itself, it
//! consumes whatever the age and geo capabilities already produced.

use serde::{Deserialize, Serialize};

use crate::config::{HIGH_RISK_TLDS, SUSPICIOUS_ISP_KEYWORDS};
use crate::geoip::GeoInfo;
use crate::whois::AgeReport;

/// Risk score at or above which a domain is considered suspicious.
const SUSPICIOUS_RISK_SCORE: u32 = 50;

/// Reputation findings for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationReport {
    /// Inverted risk score: 100 is perfect, 0 is worst.
    pub reputation_score: u32,
    /// Additive risk score across all vectors.
    pub risk_score: u32,
    /// Human-readable findings for every vector that fired.
    pub findings: Vec<String>,
    /// Risk score reached the suspicious threshold.
    pub is_suspicious: bool,
}

/// Scores the reputation of a domain.
///
/// `age` and `geo` are the (possibly absent) outputs of the age and geo
/// capabilities; an unknown age or missing geo data simply contributes
/// nothing.
pub fn analyze_reputation(
    domain: &str,
    age: Option<&AgeReport>,
    geo: Option<&GeoInfo>,
) -> ReputationReport {
    let mut findings = Vec::new();
    let mut risk_score = 0u32;

    let tld = domain.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    if HIGH_RISK_TLDS.contains(&tld.as_str()) {
        risk_score += 20;
        findings.push(format!("High-risk TLD detected (.{tld})"));
    }

    if let Some(age) = age {
        if age.is_new_domain {
            risk_score += 40;
            findings.extend(age.reasons.iter().cloned());
        }
    }

    if let Some(geo) = geo {
        let isp = geo.isp.to_ascii_lowercase();
        if SUSPICIOUS_ISP_KEYWORDS.iter().any(|kw| isp.contains(kw)) {
            risk_score += 15;
            findings.push(format!(
                "Hosted on consumer/mass-hosting infrastructure ({})",
                geo.isp
            ));
        }
    }

    if domain.chars().filter(char::is_ascii_digit).count() > 5 {
        risk_score += 10;
        findings.push("Domain contains unusually high digit count".to_string());
    }

    if domain.matches('-').count() > 2 {
        risk_score += 10;
        findings.push("Domain contains multiple hyphens (phishing pattern)".to_string());
    }

    ReputationReport {
        reputation_score: 100u32.saturating_sub(risk_score),
        risk_score,
        findings,
        is_suspicious: risk_score >= SUSPICIOUS_RISK_SCORE,
    }
}
