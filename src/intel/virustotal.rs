//! VirusTotal v3 URL report client.

use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;

use super::{IntelProvider, IntelVerdict};

const VIRUSTOTAL_ENDPOINT: &str = "https://www.virustotal.com";

/// VirusTotal URL-report client.
pub struct VirusTotal {
    client: Arc<reqwest::Client>,
    api_key: String,
    endpoint: String,
}

impl VirusTotal {
    /// Creates a client against the public VirusTotal endpoint.
    pub fn new(client: Arc<reqwest::Client>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: VIRUSTOTAL_ENDPOINT.to_string(),
        }
    }

    /// Overrides the endpoint (used by tests).
    pub fn with_endpoint(
        client: Arc<reqwest::Client>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    /// The v3 API addresses URL reports by unpadded url-safe base64.
    fn url_id(url: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(url)
    }
}

#[async_trait]
impl IntelProvider for VirusTotal {
    fn name(&self) -> &'static str {
        "VirusTotal"
    }

    async fn check(&self, url: &str) -> anyhow::Result<IntelVerdict> {
        let request_url = format!("{}/api/v3/urls/{}", self.endpoint, Self::url_id(url));
        let response = self
            .client
            .get(&request_url)
            .header("x-apikey", &self.api_key)
            .send()
            .await?;

        // 404 means VirusTotal has never seen the URL; that is a clean
        // verdict, not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(IntelVerdict {
                provider: self.name().to_string(),
                is_flagged: false,
                details: Some("URL not in VirusTotal corpus".to_string()),
            });
        }

        let body: serde_json::Value = response.error_for_status()?.json().await?;
        let stats = body
            .pointer("/data/attributes/last_analysis_stats")
            .cloned()
            .unwrap_or_default();
        let malicious = stats
            .get("malicious")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let suspicious = stats
            .get("suspicious")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        Ok(IntelVerdict {
            provider: self.name().to_string(),
            is_flagged: malicious > 0,
            details: Some(format!(
                "{malicious} malicious, {suspicious} suspicious engine verdicts"
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_id_is_unpadded_url_safe() {
        let id = VirusTotal::url_id("http://example.com/");
        assert!(!id.contains('='));
        assert!(!id.contains('+'));
        assert!(!id.contains('/'));
        assert_eq!(id, "aHR0cDovL2V4YW1wbGUuY29tLw");
    }
}
