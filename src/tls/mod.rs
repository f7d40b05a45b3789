//! TLS certificate probing and analysis.
//!
//! Connects to `domain:443`, reads the leaf certificate's issuer and expiry,
//! and turns them into findings. Uses `tokio-rustls` for the async TLS
//! connection and `x509-parser` for certificate decoding.
//!
//! The probe installs a permissive certificate verifier on purpose: the
//! scanner needs to *inspect* expired or otherwise invalid certificates, and
//! a verifying handshake would reject exactly the certificates worth
//! reporting on.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::config::{CERT_EXPIRY_WARNING_DAYS, TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS};

/// Issuer and expiry of a leaf certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Distinguished name of the certificate issuer.
    pub issuer: String,
    /// Certificate `notAfter` timestamp.
    pub not_after: DateTime<Utc>,
}

/// Certificate findings for one final URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SslReport {
    /// Final URL uses the https scheme.
    pub has_https: bool,
    /// The probe could not retrieve a certificate.
    pub probe_failed: bool,
    /// Certificate has expired.
    pub is_expired: bool,
    /// Certificate `notAfter`, when retrieved.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Days until expiry (negative when expired).
    pub days_to_expiry: Option<i64>,
    /// Certificate issuer, when retrieved.
    pub issuer: Option<String>,
    /// Human-readable reasons for fired checks.
    pub reasons: Vec<String>,
}

/// Certificate verifier that accepts every peer.
///
/// The probe reports on certificates instead of authenticating peers, so
/// verification always succeeds and the caller inspects the leaf itself.
#[derive(Debug)]
struct InspectionVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for InspectionVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Retrieves the leaf certificate's issuer and expiry for a domain.
///
/// # Errors
///
/// Returns an error if the domain name is invalid, the TCP connection or
/// TLS handshake fails or times out, or the certificate cannot be parsed.
pub async fn probe_certificate(domain: &str) -> Result<CertificateInfo> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .context("TLS protocol configuration")?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InspectionVerifier { provider }))
        .with_no_client_auth();

    let server_name = ServerName::try_from(domain.to_string())
        .map_err(|e| anyhow::anyhow!("Invalid domain name '{}': {}", domain, e))?;

    let sock = tokio::time::timeout(
        std::time::Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS),
        TcpStream::connect((domain.to_string(), 443)),
    )
    .await
    .map_err(|_| anyhow::anyhow!("TCP connection timeout for {}:443", domain))?
    .with_context(|| format!("Failed to connect to {domain}:443"))?;

    let connector = TlsConnector::from(Arc::new(config));
    let tls_stream = tokio::time::timeout(
        std::time::Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
        connector.connect(server_name, sock),
    )
    .await
    .map_err(|_| anyhow::anyhow!("TLS handshake timeout for {}", domain))?
    .with_context(|| format!("TLS handshake failed for {domain}"))?;

    let (_, session) = tls_stream.get_ref();
    let leaf = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| anyhow::anyhow!("No peer certificate presented by {}", domain))?;

    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to parse certificate for {}: {}", domain, e))?;

    let issuer = cert.issuer().to_string();
    let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| anyhow::anyhow!("Certificate notAfter out of range for {}", domain))?;

    log::debug!("Certificate for {domain}: issuer '{issuer}', expires {not_after}");

    Ok(CertificateInfo { issuer, not_after })
}

/// Analyzes the certificate of a final URL.
///
/// An `http` URL is reported without probing; anything else is probed with
/// short timeouts and the probe outcome shaped into findings.
pub async fn analyze_certificate(final_url: &str) -> SslReport {
    let parsed = Url::parse(final_url).ok();
    let is_https = parsed.as_ref().map(|u| u.scheme() == "https").unwrap_or(false);

    if !is_https {
        return build_report(false, None, Utc::now());
    }

    let Some(domain) = parsed.as_ref().and_then(|u| u.host_str()).map(str::to_string) else {
        return build_report(true, None, Utc::now());
    };

    let probe = match probe_certificate(&domain).await {
        Ok(info) => Some(info),
        Err(e) => {
            log::debug!("Certificate probe failed for {domain}: {e}");
            None
        }
    };

    build_report(true, probe, Utc::now())
}

/// Shapes a probe outcome into an [`SslReport`].
fn build_report(has_https: bool, cert: Option<CertificateInfo>, now: DateTime<Utc>) -> SslReport {
    let mut report = SslReport {
        has_https,
        probe_failed: false,
        is_expired: false,
        expiry_date: None,
        days_to_expiry: None,
        issuer: None,
        reasons: Vec::new(),
    };

    if !has_https {
        report
            .reasons
            .push("Site does not use HTTPS (insecure)".to_string());
        return report;
    }

    let Some(cert) = cert else {
        report.probe_failed = true;
        report
            .reasons
            .push("Could not retrieve TLS certificate".to_string());
        return report;
    };

    let days = (cert.not_after - now).num_days();
    report.expiry_date = Some(cert.not_after);
    report.days_to_expiry = Some(days);
    report.issuer = Some(cert.issuer);

    if days < 0 {
        report.is_expired = true;
        report
            .reasons
            .push("TLS certificate has expired".to_string());
    } else if days < CERT_EXPIRY_WARNING_DAYS {
        report
            .reasons
            .push(format!("TLS certificate expires soon ({days} days)"));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cert(days_from_now: i64, now: DateTime<Utc>) -> CertificateInfo {
        CertificateInfo {
            issuer: "CN=Test CA".to_string(),
            not_after: now + Duration::days(days_from_now),
        }
    }

    #[test]
    fn test_missing_https_is_reported_without_probe() {
        let report = build_report(false, None, Utc::now());
        assert!(!report.has_https);
        assert_eq!(report.reasons, vec!["Site does not use HTTPS (insecure)"]);
        assert!(!report.probe_failed);
    }

    #[test]
    fn test_unretrievable_certificate() {
        let report = build_report(true, None, Utc::now());
        assert!(report.probe_failed);
        assert_eq!(report.reasons, vec!["Could not retrieve TLS certificate"]);
        assert!(!report.is_expired);
    }

    #[test]
    fn test_expired_certificate() {
        let now = Utc::now();
        let report = build_report(true, Some(cert(-3, now)), now);
        assert!(report.is_expired);
        assert_eq!(report.reasons, vec!["TLS certificate has expired"]);
        assert_eq!(report.days_to_expiry, Some(-3));
    }

    #[test]
    fn test_expiring_soon_is_a_warning() {
        let now = Utc::now();
        let report = build_report(true, Some(cert(7, now)), now);
        assert!(!report.is_expired);
        assert_eq!(report.reasons.len(), 1);
        assert!(report.reasons[0].contains("expires soon"));
    }

    #[test]
    fn test_healthy_certificate_has_no_reasons() {
        let now = Utc::now();
        let report = build_report(true, Some(cert(200, now)), now);
        assert!(report.reasons.is_empty());
        assert_eq!(report.issuer.as_deref(), Some("CN=Test CA"));
        assert_eq!(report.days_to_expiry, Some(200));
    }
}
