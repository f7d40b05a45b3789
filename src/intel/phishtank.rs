//! PhishTank checkurl client.

use async_trait::async_trait;
use std::sync::Arc;

use super::{IntelProvider, IntelVerdict};

const PHISHTANK_ENDPOINT: &str = "https://checkurl.phishtank.com/checkurl/";

/// PhishTank database lookup client.
pub struct PhishTank {
    client: Arc<reqwest::Client>,
    app_key: String,
    endpoint: String,
}

impl PhishTank {
    /// Creates a client against the public PhishTank endpoint.
    pub fn new(client: Arc<reqwest::Client>, app_key: impl Into<String>) -> Self {
        Self {
            client,
            app_key: app_key.into(),
            endpoint: PHISHTANK_ENDPOINT.to_string(),
        }
    }

    /// Overrides the endpoint (used by tests).
    pub fn with_endpoint(
        client: Arc<reqwest::Client>,
        app_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            app_key: app_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl IntelProvider for PhishTank {
    fn name(&self) -> &'static str {
        "PhishTank"
    }

    async fn check(&self, url: &str) -> anyhow::Result<IntelVerdict> {
        let form = [
            ("url", url),
            ("format", "json"),
            ("app_key", self.app_key.as_str()),
        ];
        let body: serde_json::Value = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let results = body.get("results").cloned().unwrap_or_default();
        let in_database = results
            .get("in_database")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let valid = results
            .get("valid")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        // Only verified entries count; unvetted submissions stay clean.
        let is_flagged = in_database && valid;
        let details = results
            .get("phish_detail_page")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(IntelVerdict {
            provider: self.name().to_string(),
            is_flagged,
            details,
        })
    }
}
