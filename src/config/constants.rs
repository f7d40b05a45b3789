//! Configuration constants.
//!
//! Timeouts, limits and the fixed risk lists used by the detectors.

use std::time::Duration;

/// Maximum number of redirect hops followed by the tracer.
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Timeout for lightweight network probes (redirect probes, RDAP, geo lookups).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP connection timeout for the certificate probe, in seconds.
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// TLS handshake timeout for the certificate probe, in seconds.
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 5;

/// Timeout for a single screenshot capture.
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for one threat-intel provider call.
pub const INTEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single webhook delivery attempt.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// DNS query timeout in seconds.
pub const DNS_TIMEOUT_SECS: u64 = 3;

/// Certificates expiring within this many days produce a warning finding.
pub const CERT_EXPIRY_WARNING_DAYS: i64 = 14;

/// Screenshots older than this are purged when the browser shuts down.
pub const SCREENSHOT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default SQLite path for the scan cache.
pub const DEFAULT_CACHE_PATH: &str = "./linkguard.db";

/// Default User-Agent string for HTTP requests.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// TLDs with a disproportionate share of abuse, worth +20 risk on their own.
pub const HIGH_RISK_TLDS: &[&str] = &[
    "top", "xyz", "zip", "mov", "win", "bid", "pw", "monster", "icu", "click", "country", "gdn",
    "science", "gq", "tk", "ml", "ga", "cf",
];

/// ISP/organization keywords for commodity hosting commonly abused for phishing.
pub const SUSPICIOUS_ISP_KEYWORDS: &[&str] = &[
    "digitalocean",
    "ovh",
    "hetzner",
    "linode",
    "vultr",
    "m247",
    "choopa",
];

/// Keywords in a hostname that suggest a credential-harvesting page.
pub const SENSITIVE_KEYWORDS: &[&str] = &[
    "login", "signin", "secure", "bank", "account", "verify", "update",
];

/// Brands commonly impersonated in phishing URLs.
///
/// A hostname mentioning the brand keyword while not containing the brand's
/// real domain contributes the listed impersonation score.
pub const PROTECTED_BRANDS: &[(&str, &str, u32)] = &[
    ("paypal", "paypal.com", 90),
    ("microsoft", "microsoft.com", 85),
    ("apple", "apple.com", 85),
    ("amazon", "amazon.com", 85),
    ("netflix", "netflix.com", 85),
    ("facebook", "facebook.com", 85),
];

/// Default popular-domain list used for typosquatting checks when the caller
/// does not supply one.
pub const DEFAULT_POPULAR_DOMAINS: &[&str] = &[
    "google.com",
    "youtube.com",
    "facebook.com",
    "amazon.com",
    "wikipedia.org",
    "twitter.com",
    "instagram.com",
    "linkedin.com",
    "microsoft.com",
    "apple.com",
    "netflix.com",
    "paypal.com",
    "github.com",
    "dropbox.com",
    "ebay.com",
];
