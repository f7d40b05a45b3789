//! Typed errors exposed by the scanning API.

use thiserror::Error;

/// Errors that abort a scan.
///
/// Detector failures never abort a scan; they fail open into absent
/// sub-results. The only fatal condition is input the canonicalizer cannot
/// turn into a scannable URL.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The input could not be parsed as an http/https URL with a host.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The raw input that failed to parse.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
}

/// Errors raised while bringing up shared resources at startup.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Logger setup failed (usually: already initialized).
    #[error("Logger initialization failed: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    /// HTTP client construction failed.
    #[error("HTTP client initialization failed: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// Scan cache could not be opened.
    #[error("Scan cache initialization failed: {0:#}")]
    CacheError(anyhow::Error),
}
