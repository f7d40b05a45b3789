//! Lexical heuristics over a URL's domain.
//!
//! Pure, synchronous checks with no I/O:
//! - Punycode prefix (IDN homograph risk)
//! - Shannon entropy of the domain string (DGA detection)
//! - Levenshtein typosquatting distance against a popular-domain list
//! - Structural anomalies (userinfo in the authority, excessive subdomains)
//!
//! The analyzer only reports reasons; deciding the verdict is the combiner's
//! job.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Settings;

/// Maximum edit distance at which a domain counts as a typosquat.
const TYPOSQUAT_DISTANCE: usize = 2;

/// Number of dot-separated labels above which a domain is suspicious.
const MAX_LABELS: usize = 4;

/// Result of the lexical analysis of one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicReport {
    /// Domain the checks ran against (port and `www.` prefix stripped).
    pub domain: String,
    /// Domain begins with the `xn--` punycode prefix.
    pub is_punycode: bool,
    /// Shannon entropy of the domain string, in bits.
    pub entropy: f64,
    /// Popular domain this one appears to typosquat, if any.
    pub typosquatting: Option<String>,
    /// Userinfo in the authority or excessive subdomains.
    pub suspicious_structure: bool,
    /// Human-readable reasons for every fired check.
    pub reasons: Vec<String>,
}

/// Strips the port and a leading `www.` from a host string.
pub fn host_for_analysis(host: &str) -> String {
    let without_port = host.rsplit_once(':').map_or(host, |(h, port)| {
        // Only treat the suffix as a port if it is numeric; IPv6 hosts keep
        // their colons.
        if port.chars().all(|c| c.is_ascii_digit()) {
            h
        } else {
            host
        }
    });
    without_port
        .strip_prefix("www.")
        .unwrap_or(without_port)
        .to_ascii_lowercase()
}

/// Checks whether a domain uses the punycode (`xn--`) prefix.
pub fn is_punycode(domain: &str) -> bool {
    domain.starts_with("xn--")
}

/// Shannon entropy over the byte values of a string, in bits.
///
/// Uses the relative frequency of each of the 256 possible byte values, so
/// the result is always within `[0, 8]`; the empty string has entropy 0.
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let mut counts = [0usize; 256];
    for byte in text.bytes() {
        counts[byte as usize] += 1;
    }

    let len = text.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Levenshtein edit distance between two strings.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let insertion = previous[j + 1] + 1;
            let deletion = current[j] + 1;
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = insertion.min(deletion).min(substitution);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Checks a domain against a popular-domain list for typosquatting.
///
/// Compares only the first label of each side. A non-identical label within
/// edit distance 2 is a match; the first matching popular domain wins, so
/// the list order is the tie-break.
pub fn check_typosquatting<S: AsRef<str>>(domain: &str, popular: &[S]) -> Option<String> {
    let label = domain.split('.').next().unwrap_or(domain);
    for target in popular {
        let target = target.as_ref();
        let target_label = target.split('.').next().unwrap_or(target);
        if label != target_label && levenshtein(label, target_label) <= TYPOSQUAT_DISTANCE {
            return Some(target.to_string());
        }
    }
    None
}

/// Runs every lexical check against a URL.
///
/// The URL is parsed best-effort; input without a parseable host falls back
/// to the first path segment, mirroring how bare domains arrive.
pub fn analyze<S: AsRef<str>>(url: &str, popular: &[S], settings: &Settings) -> HeuristicReport {
    let parsed = Url::parse(url).ok();
    let raw_host = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            url.trim_start_matches("http://")
                .trim_start_matches("https://")
                .split('/')
                .next()
                .unwrap_or(url)
                .to_string()
        });
    let domain = host_for_analysis(&raw_host);

    let has_userinfo = parsed
        .as_ref()
        .map(|u| !u.username().is_empty() || u.password().is_some())
        .unwrap_or(false);

    let mut report = HeuristicReport {
        domain: domain.clone(),
        is_punycode: is_punycode(&domain),
        entropy: shannon_entropy(&domain),
        typosquatting: None,
        suspicious_structure: false,
        reasons: Vec::new(),
    };

    if report.is_punycode {
        report
            .reasons
            .push("Punycode detected (IDN homograph attack risk)".to_string());
    }

    if report.entropy > settings.max_entropy_threshold {
        report
            .reasons
            .push(format!("High domain entropy ({:.2})", report.entropy));
    }

    if let Some(target) = check_typosquatting(&domain, popular) {
        report
            .reasons
            .push(format!("Possible typosquatting of '{target}'"));
        report.typosquatting = Some(target);
    }

    if has_userinfo {
        report.suspicious_structure = true;
        report
            .reasons
            .push("UserInfo (@) found in URL (credentials phishing risk)".to_string());
    }

    if domain.split('.').count() > MAX_LABELS {
        report.suspicious_structure = true;
        report.reasons.push("Too many subdomains".to_string());
    }

    report
}
