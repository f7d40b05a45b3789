//! Google Safe Browsing v4 lookup client.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{IntelProvider, IntelVerdict};

const SAFE_BROWSING_ENDPOINT: &str = "https://safebrowsing.googleapis.com";

/// Safe Browsing `threatMatches:find` client.
pub struct GoogleSafeBrowsing {
    client: Arc<reqwest::Client>,
    api_key: String,
    endpoint: String,
}

impl GoogleSafeBrowsing {
    /// Creates a client against the public Safe Browsing endpoint.
    pub fn new(client: Arc<reqwest::Client>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: SAFE_BROWSING_ENDPOINT.to_string(),
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
}

#[async_trait]
impl IntelProvider for GoogleSafeBrowsing {
    fn name(&self) -> &'static str {
        "Google Safe Browsing"
    }

    async fn check(&self, url: &str) -> anyhow::Result<IntelVerdict> {
        let request_url = format!(
            "{}/v4/threatMatches:find?key={}",
            self.endpoint, self.api_key
        );
        let body = json!({
            "client": { "clientId": "linkguard", "clientVersion": env!("CARGO_PKG_VERSION") },
            "threatInfo": {
                "threatTypes": [
                    "MALWARE",
                    "SOCIAL_ENGINEERING",
                    "UNWANTED_SOFTWARE",
                    "POTENTIALLY_HARMFUL_APPLICATION"
                ],
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{ "url": url }]
            }
        });

        let response: serde_json::Value = self
            .client
            .post(&request_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let matches = response.get("matches").and_then(|m| m.as_array());
        let is_flagged = matches.map(|m| !m.is_empty()).unwrap_or(false);
        let details = matches.and_then(|m| {
            m.first()
                .and_then(|hit| hit.get("threatType"))
                .and_then(|t| t.as_str())
                .map(str::to_string)
        });

        Ok(IntelVerdict {
            provider: self.name().to_string(),
            is_flagged,
            details,
        })
    }
}
