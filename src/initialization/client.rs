//! HTTP client initialization.
//!
//! This module provides functions to initialize HTTP clients with proper
//! configuration for API requests and manual redirect probing.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::DEFAULT_USER_AGENT;

/// Initializes the HTTP client used for provider APIs and lookups.
///
/// Creates a `reqwest::Client` configured with:
/// - A browser-like User-Agent header
/// - A per-request timeout
/// - Redirect following enabled (reqwest default, up to 10 hops)
///
/// # Arguments
///
/// * `timeout_seconds` - Per-request timeout in seconds
///
/// # Returns
///
/// A configured HTTP client ready for making requests.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(timeout_seconds: u64) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(DEFAULT_USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the HTTP client used for redirect tracing.
///
/// Creates a `reqwest::Client` with redirects disabled so the tracer can
/// follow the chain manually and capture every intermediate URL.
///
/// # Arguments
///
/// * `timeout_seconds` - Per-request timeout in seconds
///
/// # Returns
///
/// A configured HTTP client with redirects disabled.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_probe_client(timeout_seconds: u64) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(DEFAULT_USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}
