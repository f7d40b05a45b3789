//! Verdict aggregation.
//!
//! Collects every detector's findings into a fixed order (reputation,
//! heuristics, age, certificate, jurisdiction, intel, visual), marks which
//! of them trigger the malicious verdict on their own, and deduplicates the
//! reason strings while preserving that order. The verdict is the OR of the
//! contributing findings; signals that merely inform (an expiring
//! certificate, a failed probe) are carried but never flip the verdict.

use crate::geoip::GeoInfo;
use crate::heuristics::HeuristicReport;
use crate::intel::IntelVerdict;
use crate::jurisdiction::JurisdictionReport;
use crate::models::{DetectorKind, Finding, RiskTier};
use crate::reputation::ReputationReport;
use crate::tls::SslReport;
use crate::visual::VisualReport;
use crate::whois::AgeReport;

/// Everything the detectors produced for one URL.
pub struct VerdictInput<'a> {
    /// Lexical heuristics for the input URL.
    pub heuristics: &'a HeuristicReport,
    /// Lexical heuristics for the final URL, when traced and different.
    pub final_heuristics: Option<&'a HeuristicReport>,
    /// Registration age findings.
    pub whois: Option<&'a AgeReport>,
    /// TLS certificate findings.
    pub ssl: Option<&'a SslReport>,
    /// Geolocation of the final domain (carried for completeness).
    pub geo: Option<&'a GeoInfo>,
    /// Reputation score.
    pub reputation: &'a ReputationReport,
    /// Jurisdiction findings.
    pub jurisdiction: Option<&'a JurisdictionReport>,
    /// External provider verdicts.
    pub intel: &'a [IntelVerdict],
    /// Visual findings.
    pub visual: Option<&'a VisualReport>,
}

/// The aggregate verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// At least one contributing finding fired.
    pub is_malicious: bool,
    /// All findings in detector order.
    pub findings: Vec<Finding>,
    /// Deduplicated reason strings, same order as `findings`.
    pub reasons: Vec<String>,
}

fn push(findings: &mut Vec<Finding>, detector: DetectorKind, reason: &str, contributes: bool) {
    findings.push(Finding {
        detector,
        reason: reason.to_string(),
        contributes,
    });
}

/// Evaluates the aggregate verdict over all detector outputs.
pub fn evaluate(input: &VerdictInput<'_>) -> Verdict {
    let mut findings = Vec::new();

    for reason in &input.reputation.findings {
        push(
            &mut findings,
            DetectorKind::Reputation,
            reason,
            input.reputation.is_suspicious,
        );
    }

    for reason in &input.heuristics.reasons {
        push(&mut findings, DetectorKind::Heuristics, reason, true);
    }
    if let Some(final_heuristics) = input.final_heuristics {
        for reason in &final_heuristics.reasons {
            push(&mut findings, DetectorKind::Heuristics, reason, true);
        }
    }

    if let Some(whois) = input.whois {
        for reason in &whois.reasons {
            push(&mut findings, DetectorKind::Age, reason, whois.is_new_domain);
        }
    }

    if let Some(ssl) = input.ssl {
        // Expired certificates, plain-http pages and unretrievable
        // certificates are decisive; a soon-to-expire certificate only
        // informs.
        let contributes = ssl.is_expired || !ssl.has_https || ssl.probe_failed;
        for reason in &ssl.reasons {
            push(&mut findings, DetectorKind::Certificate, reason, contributes);
        }
    }

    if let Some(jurisdiction) = input.jurisdiction {
        let contributes =
            jurisdiction.jump_risk == RiskTier::High || jurisdiction.exceeds_limit;
        for reason in &jurisdiction.reasons {
            push(&mut findings, DetectorKind::Jurisdiction, reason, contributes);
        }
    }

    for verdict in input.intel {
        if verdict.is_flagged {
            push(
                &mut findings,
                DetectorKind::Intel,
                &format!("Flagged by {}", verdict.provider),
                true,
            );
        }
    }

    if let Some(visual) = input.visual {
        let high = visual.impersonation_risk == RiskTier::High;
        for reason in &visual.findings {
            push(&mut findings, DetectorKind::Visual, reason, high);
        }
        if high {
            push(
                &mut findings,
                DetectorKind::Visual,
                "Visual impersonation detected",
                true,
            );
        }
    }

    let is_malicious = findings.iter().any(|f| f.contributes);
    let mut reasons: Vec<String> = Vec::new();
    for finding in &findings {
        if !reasons.contains(&finding.reason) {
            reasons.push(finding.reason.clone());
        }
    }

    Verdict {
        is_malicious,
        findings,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::analyze;
    use crate::reputation::analyze_reputation;
    use crate::visual::{score_impersonation, score_tier, VisualReport};
    use crate::whois::analyze_domain_age;
    use crate::config::{Settings, DEFAULT_POPULAR_DOMAINS};

    fn clean_input<'a>(
        heuristics: &'a HeuristicReport,
        reputation: &'a ReputationReport,
    ) -> VerdictInput<'a> {
        VerdictInput {
            heuristics,
            final_heuristics: None,
            whois: None,
            ssl: None,
            geo: None,
            reputation,
            jurisdiction: None,
            intel: &[],
            visual: None,
        }
    }

    #[test]
    fn test_clean_url_is_benign() {
        let settings = Settings::default();
        let heuristics = analyze("https://google.com/", DEFAULT_POPULAR_DOMAINS, &settings);
        let reputation = analyze_reputation("google.com", None, None);
        let verdict = evaluate(&clean_input(&heuristics, &reputation));
        assert!(!verdict.is_malicious);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_heuristic_reason_triggers() {
        let settings = Settings::default();
        let heuristics = analyze(
            "http://xn--pypal-4ve.com/",
            DEFAULT_POPULAR_DOMAINS,
            &settings,
        );
        let reputation = analyze_reputation("xn--pypal-4ve.com", None, None);
        let verdict = evaluate(&clean_input(&heuristics, &reputation));
        assert!(verdict.is_malicious);
        assert!(verdict
            .reasons
            .iter()
            .any(|r| r.contains("Punycode detected")));
    }

    #[test]
    fn test_expiring_soon_does_not_trigger() {
        let settings = Settings::default();
        let heuristics = analyze("https://example.com/", DEFAULT_POPULAR_DOMAINS, &settings);
        let reputation = analyze_reputation("example.com", None, None);
        let ssl = SslReport {
            has_https: true,
            probe_failed: false,
            is_expired: false,
            expiry_date: None,
            days_to_expiry: Some(7),
            issuer: Some("CN=Test".to_string()),
            reasons: vec!["TLS certificate expires soon (7 days)".to_string()],
        };
        let mut input = clean_input(&heuristics, &reputation);
        input.ssl = Some(&ssl);
        let verdict = evaluate(&input);
        assert!(!verdict.is_malicious);
        assert_eq!(verdict.reasons.len(), 1);
    }

    #[test]
    fn test_missing_https_triggers() {
        let settings = Settings::default();
        let heuristics = analyze("http://example.com/", DEFAULT_POPULAR_DOMAINS, &settings);
        let reputation = analyze_reputation("example.com", None, None);
        let ssl = SslReport {
            has_https: false,
            probe_failed: false,
            is_expired: false,
            expiry_date: None,
            days_to_expiry: None,
            issuer: None,
            reasons: vec!["Site does not use HTTPS (insecure)".to_string()],
        };
        let mut input = clean_input(&heuristics, &reputation);
        input.ssl = Some(&ssl);
        let verdict = evaluate(&input);
        assert!(verdict.is_malicious);
    }

    #[test]
    fn test_new_domain_reason_deduplicated_with_reputation() {
        let settings = Settings::default();
        let heuristics = analyze("http://fresh.xyz/", DEFAULT_POPULAR_DOMAINS, &settings);
        let age = analyze_domain_age(Some(3), 30);
        let reputation = analyze_reputation("fresh.xyz", Some(&age), None);
        let mut input = clean_input(&heuristics, &reputation);
        input.whois = Some(&age);
        let verdict = evaluate(&input);
        assert!(verdict.is_malicious);
        let new_domain_reasons = verdict
            .reasons
            .iter()
            .filter(|r| r.contains("very new"))
            .count();
        assert_eq!(new_domain_reasons, 1);
    }

    #[test]
    fn test_flagged_provider_triggers() {
        let settings = Settings::default();
        let heuristics = analyze("https://example.com/", DEFAULT_POPULAR_DOMAINS, &settings);
        let reputation = analyze_reputation("example.com", None, None);
        let intel = vec![
            IntelVerdict {
                provider: "VirusTotal".to_string(),
                is_flagged: false,
                details: None,
            },
            IntelVerdict {
                provider: "PhishTank".to_string(),
                is_flagged: true,
                details: None,
            },
        ];
        let mut input = clean_input(&heuristics, &reputation);
        input.intel = &intel;
        let verdict = evaluate(&input);
        assert!(verdict.is_malicious);
        assert_eq!(verdict.reasons, vec!["Flagged by PhishTank"]);
    }

    #[test]
    fn test_high_visual_risk_triggers() {
        let settings = Settings::default();
        let heuristics = analyze(
            "https://paypal-help.example.com/",
            DEFAULT_POPULAR_DOMAINS,
            &settings,
        );
        let reputation = analyze_reputation("paypal-help.example.com", None, None);
        let (score, findings) = score_impersonation("paypal-help.example.com");
        let visual = VisualReport {
            impersonation_risk: score_tier(score),
            vision_score: score,
            findings,
            analysis_provider: "lexical".to_string(),
        };
        let mut input = clean_input(&heuristics, &reputation);
        input.visual = Some(&visual);
        let verdict = evaluate(&input);
        assert!(verdict.is_malicious);
        assert!(verdict
            .reasons
            .contains(&"Visual impersonation detected".to_string()));
    }

    #[test]
    fn test_reasons_follow_detector_order() {
        let settings = Settings::default();
        let heuristics = analyze("http://xn--pypal.tk/", DEFAULT_POPULAR_DOMAINS, &settings);
        let reputation = analyze_reputation("xn--pypal.tk", None, None);
        let verdict = evaluate(&clean_input(&heuristics, &reputation));
        // Reputation findings (TLD) come before heuristic findings (punycode).
        assert!(verdict.reasons[0].contains("High-risk TLD"));
        assert!(verdict.reasons[1].contains("Punycode"));
    }
}
