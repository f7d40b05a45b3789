//! External threat-intelligence providers.
//!
//! Each provider is a small client behind the [`IntelProvider`] trait.
//! Providers are credential-gated: a provider whose API key is absent is
//! never constructed, so an unconfigured deployment silently scans with
//! zero providers instead of failing. Queries fail open; a provider error
//! or timeout drops that provider's verdict and the scan continues.

mod google;
mod phishtank;
mod virustotal;

pub use google::GoogleSafeBrowsing;
pub use phishtank::PhishTank;
pub use virustotal::VirusTotal;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::INTEL_TIMEOUT;
use crate::models::ProviderCredentials;
use crate::scheduler::Scheduler;

/// Verdict from one external provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelVerdict {
    /// Provider name, stable across runs.
    pub provider: String,
    /// The provider flagged the URL.
    pub is_flagged: bool,
    /// Provider-specific detail (threat type, analysis stats).
    pub details: Option<String>,
}

/// Capability: query one external reputation source for a URL.
#[async_trait]
pub trait IntelProvider: Send + Sync {
    /// Stable provider name used in verdicts and logs.
    fn name(&self) -> &'static str;

    /// Queries the provider.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider is unreachable or replies with
    /// something unparseable; the caller treats that as "no verdict".
    async fn check(&self, url: &str) -> anyhow::Result<IntelVerdict>;
}

/// Builds every provider that has a credential configured.
pub fn build_providers(
    client: Arc<reqwest::Client>,
    credentials: &ProviderCredentials,
) -> Vec<Arc<dyn IntelProvider>> {
    let mut providers: Vec<Arc<dyn IntelProvider>> = Vec::new();
    if let Some(key) = &credentials.google_api_key {
        providers.push(Arc::new(GoogleSafeBrowsing::new(Arc::clone(&client), key)));
    }
    if let Some(key) = &credentials.vt_api_key {
        providers.push(Arc::new(VirusTotal::new(Arc::clone(&client), key)));
    }
    if let Some(key) = &credentials.phishtank_app_key {
        providers.push(Arc::new(PhishTank::new(Arc::clone(&client), key)));
    }
    providers
}

/// Queries all providers for one URL and collects the verdicts that arrived.
///
/// Each provider gets its own timeout; failures and timeouts are logged and
/// dropped.
pub async fn gather_intel(
    providers: &[Arc<dyn IntelProvider>],
    url: &str,
    scheduler: &Scheduler,
) -> Vec<IntelVerdict> {
    let futures = providers
        .iter()
        .map(|provider| {
            let provider = Arc::clone(provider);
            let url = url.to_string();
            async move {
                match tokio::time::timeout(INTEL_TIMEOUT, provider.check(&url)).await {
                    Ok(Ok(verdict)) => Some(verdict),
                    Ok(Err(e)) => {
                        log::warn!("Intel provider {} failed for {url}: {e}", provider.name());
                        None
                    }
                    Err(_) => {
                        log::warn!("Intel provider {} timed out for {url}", provider.name());
                        None
                    }
                }
            }
            .boxed()
        })
        .collect();

    scheduler
        .join_all(futures)
        .await
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credentials_builds_no_providers() {
        let client = Arc::new(reqwest::Client::new());
        let providers = build_providers(client, &ProviderCredentials::default());
        assert!(providers.is_empty());
    }

    #[test]
    fn test_each_credential_gates_one_provider() {
        let client = Arc::new(reqwest::Client::new());
        let credentials = ProviderCredentials {
            google_api_key: Some("g".to_string()),
            vt_api_key: None,
            phishtank_app_key: Some("p".to_string()),
        };
        let providers = build_providers(client, &credentials);
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Google Safe Browsing", "PhishTank"]);
    }

    #[tokio::test]
    async fn test_failing_provider_is_dropped() {
        struct Broken;

        #[async_trait]
        impl IntelProvider for Broken {
            fn name(&self) -> &'static str {
                "Broken"
            }
            async fn check(&self, _url: &str) -> anyhow::Result<IntelVerdict> {
                anyhow::bail!("boom")
            }
        }

        struct Fine;

        #[async_trait]
        impl IntelProvider for Fine {
            fn name(&self) -> &'static str {
                "Fine"
            }
            async fn check(&self, _url: &str) -> anyhow::Result<IntelVerdict> {
                Ok(IntelVerdict {
                    provider: "Fine".to_string(),
                    is_flagged: true,
                    details: None,
                })
            }
        }

        let providers: Vec<Arc<dyn IntelProvider>> = vec![Arc::new(Broken), Arc::new(Fine)];
        let verdicts =
            gather_intel(&providers, "http://example.com/", &Scheduler::serialized()).await;
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].provider, "Fine");
        assert!(verdicts[0].is_flagged);
    }
}
