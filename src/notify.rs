//! Webhook notifications for malicious verdicts.
//!
//! Deliveries are fire-and-forget: each active webhook gets its own spawned
//! task with a short timeout, and failures are logged rather than surfaced,
//! so a dead endpoint never slows a scan down. Payloads are optionally
//! signed with HMAC-SHA256 over the exact body bytes.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;

use crate::config::WEBHOOK_TIMEOUT;
use crate::models::ScanReport;

/// Signature header attached to signed deliveries.
pub const SIGNATURE_HEADER: &str = "X-Linkguard-Signature";

/// One configured webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    /// Delivery URL.
    pub url: String,
    /// Operator-facing description.
    pub description: String,
    /// Shared secret for HMAC signing; unsigned when absent.
    pub secret: Option<String>,
    /// Inactive webhooks are skipped without logging.
    pub active: bool,
}

/// Dispatches malicious-verdict notifications to configured webhooks.
pub struct WebhookNotifier {
    client: Arc<reqwest::Client>,
    webhooks: Vec<Webhook>,
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

impl WebhookNotifier {
    /// Creates a notifier over a fixed set of webhooks.
    pub fn new(client: Arc<reqwest::Client>, webhooks: Vec<Webhook>) -> Self {
        Self { client, webhooks }
    }

    /// Whether any active webhook is configured.
    pub fn is_active(&self) -> bool {
        self.webhooks.iter().any(|w| w.active)
    }

    /// Builds the JSON payload for one report.
    fn payload(report: &ScanReport) -> serde_json::Value {
        json!({
            "url": report.url,
            "is_malicious": report.is_malicious,
            "reasons": report.reasons,
            "scanned_at": report.scanned_at,
        })
    }

    /// Dispatches the report to every active webhook.
    ///
    /// Returns immediately; deliveries run on spawned tasks.
    pub fn dispatch(&self, report: &ScanReport) {
        let payload = Self::payload(report);
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Failed to encode webhook payload: {e}");
                return;
            }
        };

        for webhook in self.webhooks.iter().filter(|w| w.active) {
            let client = Arc::clone(&self.client);
            let webhook = webhook.clone();
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = client
                    .post(&webhook.url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .timeout(WEBHOOK_TIMEOUT)
                    .body(body.clone());
                if let Some(secret) = &webhook.secret {
                    request = request.header(SIGNATURE_HEADER, sign(secret, &body));
                }
                match request.send().await {
                    Ok(response) if response.status().is_success() => {
                        log::debug!("Webhook delivered to {}", webhook.url);
                    }
                    Ok(response) => {
                        log::warn!(
                            "Webhook {} answered {}",
                            webhook.url,
                            response.status()
                        );
                    }
                    Err(e) => {
                        log::warn!("Webhook delivery to {} failed: {e}", webhook.url);
                    }
                }
            });
        }
    }
}
