//! Geolocation and hosting lookup for a domain.
//!
//! Resolves the domain to an IP with the shared async resolver, then asks
//! the ip-api.com JSON endpoint for country, city and ISP. The lookup is a
//! capability trait so the jurisdiction analyzer and reputation scorer can
//! be tested without the network.

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PROBE_TIMEOUT;

/// Default ip-api.com endpoint (free tier, HTTP only).
const IP_API_ENDPOINT: &str = "http://ip-api.com/json";

/// Geolocation and hosting metadata for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    /// Resolved IP address.
    pub ip: String,
    /// Country name.
    pub country: String,
    /// City name.
    pub city: String,
    /// ISP or hosting organization.
    pub isp: String,
}

/// Capability: resolve geolocation metadata for a domain.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Returns geo metadata, or `None` when resolution or the lookup fails.
    async fn lookup(&self, domain: &str) -> Option<GeoInfo>;
}

/// DNS + ip-api.com backed [`GeoLookup`] implementation.
pub struct IpApiGeoLookup {
    resolver: Arc<TokioAsyncResolver>,
    client: Arc<reqwest::Client>,
    endpoint: String,
}

impl IpApiGeoLookup {
    /// Creates a lookup against the public ip-api.com endpoint.
    pub fn new(resolver: Arc<TokioAsyncResolver>, client: Arc<reqwest::Client>) -> Self {
        Self {
            resolver,
            client,
            endpoint: IP_API_ENDPOINT.to_string(),
        }
    }

    /// Overrides the ip-api endpoint (used by tests).
    pub fn with_endpoint(
        resolver: Arc<TokioAsyncResolver>,
        client: Arc<reqwest::Client>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, domain: &str) -> anyhow::Result<Option<GeoInfo>> {
        let lookup = self.resolver.lookup_ip(domain).await?;
        let Some(ip) = lookup.iter().next() else {
            return Ok(None);
        };

        let url = format!(
            "{}/{ip}?fields=status,message,country,city,isp,query",
            self.endpoint
        );
        let body: serde_json::Value = self.client.get(&url).send().await?.json().await?;

        if body.get("status").and_then(|s| s.as_str()) != Some("success") {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown");
            log::warn!("Geo query failed for {domain} ({ip}): {message}");
            return Ok(None);
        }

        let field = |name: &str| {
            body.get(name)
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string()
        };

        Ok(Some(GeoInfo {
            ip: ip.to_string(),
            country: field("country"),
            city: field("city"),
            isp: field("isp"),
        }))
    }
}

#[async_trait]
impl GeoLookup for IpApiGeoLookup {
    async fn lookup(&self, domain: &str) -> Option<GeoInfo> {
        if domain.is_empty() {
            return None;
        }
        match tokio::time::timeout(PROBE_TIMEOUT, self.fetch(domain)).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                log::warn!("Geo lookup failed for {domain}: {e}");
                None
            }
            Err(_) => {
                log::warn!("Geo lookup timed out for {domain}");
                None
            }
        }
    }
}
