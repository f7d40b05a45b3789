//! Shared request, finding and report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::geoip::GeoInfo;
use crate::heuristics::HeuristicReport;
use crate::intel::IntelVerdict;
use crate::jurisdiction::JurisdictionReport;
use crate::reputation::ReputationReport;
use crate::tls::SslReport;
use crate::visual::VisualReport;
use crate::whois::AgeReport;

/// Credentials for external threat-intel providers.
///
/// Every field is optional; a provider without a credential is skipped
/// silently rather than queried anonymously.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// Google Safe Browsing v4 API key.
    pub google_api_key: Option<String>,
    /// VirusTotal v3 API key.
    pub vt_api_key: Option<String>,
    /// PhishTank application key.
    pub phishtank_app_key: Option<String>,
}

impl ProviderCredentials {
    /// Reads credentials from the conventional environment variables.
    pub fn from_env() -> Self {
        Self {
            google_api_key: std::env::var("GOOGLE_SAFE_BROWSING_API_KEY").ok(),
            vt_api_key: std::env::var("VIRUSTOTAL_API_KEY").ok(),
            phishtank_app_key: std::env::var("PHISHTANK_APP_KEY").ok(),
        }
    }
}

/// One scan request: a URL plus per-scan feature switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// URL to scan (canonicalized by the scanner).
    pub url: String,
    /// Bypass the cache and force a fresh scan.
    pub skip_cache: bool,
    /// Follow and analyze the redirect chain.
    pub trace_redirects: bool,
    /// Run the registration-age lookup.
    pub check_age: bool,
    /// Query external threat-intel providers.
    pub check_intel: bool,
    /// Probe the TLS certificate.
    pub check_certificate: bool,
    /// Run visual impersonation analysis.
    pub check_visual: bool,
    /// Provider credentials for this request.
    pub credentials: ProviderCredentials,
}

impl ScanRequest {
    /// A request with every check enabled and the cache honored.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            skip_cache: false,
            trace_redirects: true,
            check_age: true,
            check_intel: true,
            check_certificate: true,
            check_visual: true,
            credentials: ProviderCredentials::default(),
        }
    }
}

/// Which detector produced a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Additive reputation scoring.
    Reputation,
    /// Lexical heuristics (punycode, entropy, typosquatting, structure).
    Heuristics,
    /// Registration age.
    Age,
    /// TLS certificate state.
    Certificate,
    /// Hosting jurisdiction of the redirect chain.
    Jurisdiction,
    /// External threat-intel providers.
    Intel,
    /// Visual impersonation analysis.
    Visual,
}

impl DetectorKind {
    /// Stable lowercase name used in logs and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Reputation => "reputation",
            DetectorKind::Heuristics => "heuristics",
            DetectorKind::Age => "age",
            DetectorKind::Certificate => "certificate",
            DetectorKind::Jurisdiction => "jurisdiction",
            DetectorKind::Intel => "intel",
            DetectorKind::Visual => "visual",
        }
    }
}

/// One reason emitted by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Detector that produced the reason.
    pub detector: DetectorKind,
    /// Human-readable reason text.
    pub reason: String,
    /// Whether this finding triggers the malicious verdict on its own.
    pub contributes: bool,
}

/// Coarse risk tier used by jurisdiction and visual analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// No elevated risk.
    Low,
    /// Elevated but not decisive.
    Medium,
    /// Decisive risk.
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        };
        f.write_str(s)
    }
}

/// The full result of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Canonicalized input URL.
    pub url: String,
    /// Last URL in the redirect chain (equals `url` when not traced).
    pub final_url: String,
    /// Host analyzed by the domain-level detectors.
    pub domain: String,
    /// Redirect chain starting with the input URL.
    pub redirect_chain: Vec<String>,
    /// Lexical heuristics for the input URL.
    pub heuristics: HeuristicReport,
    /// Lexical heuristics for the final URL, when it differs.
    pub final_heuristics: Option<HeuristicReport>,
    /// Registration age findings.
    pub whois: Option<AgeReport>,
    /// TLS certificate findings.
    pub ssl: Option<SslReport>,
    /// Geolocation of the final domain.
    pub geo: Option<GeoInfo>,
    /// Reputation score of the final domain.
    pub reputation: ReputationReport,
    /// Hosting jurisdiction findings over the redirect chain.
    pub jurisdiction: Option<JurisdictionReport>,
    /// Verdicts from external threat-intel providers.
    pub external_intel: Vec<IntelVerdict>,
    /// Visual impersonation findings.
    pub visual: Option<VisualReport>,
    /// Path of the captured screenshot, when one was taken.
    pub screenshot_path: Option<String>,
    /// Aggregate verdict.
    pub is_malicious: bool,
    /// Deduplicated reasons behind the verdict, in detector order.
    pub reasons: Vec<String>,
    /// When the scan ran.
    pub scanned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_request_defaults_enable_everything() {
        let req = ScanRequest::new("http://example.com");
        assert!(!req.skip_cache);
        assert!(req.trace_redirects);
        assert!(req.check_age);
        assert!(req.check_intel);
        assert!(req.check_certificate);
        assert!(req.check_visual);
    }

    #[test]
    fn test_detector_names_are_unique() {
        let names: std::collections::HashSet<_> =
            DetectorKind::iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), DetectorKind::iter().count());
    }

    #[test]
    fn test_risk_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert_eq!(RiskTier::High.to_string(), "High");
    }
}
