//! linkguard library: heuristic malicious-URL scanning.
//!
//! This library aggregates lexical heuristics, registration age, TLS
//! certificate state, hosting geolocation, redirect-chain jurisdiction,
//! external threat intelligence and visual impersonation signals into a
//! single verdict per URL, backed by a SQLite result cache.
//!
//! # Example
//!
//! ```no_run
//! use linkguard::{ScanRequest, ScannerBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scanner = ScannerBuilder::new()
//!     .with_cache_path("./linkguard.db")
//!     .build()
//!     .await?;
//!
//! let (report, from_cache) = scanner.scan(&ScanRequest::new("http://example.com")).await?;
//! println!(
//!     "{}: malicious={} (cached={}), reasons: {:?}",
//!     report.url, report.is_malicious, from_cache, report.reasons
//! );
//! scanner.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod cache;
pub mod canonical;
pub mod config;
mod error;
pub mod geoip;
pub mod heuristics;
pub mod initialization;
pub mod intel;
pub mod jurisdiction;
mod models;
pub mod notify;
pub mod redirects;
pub mod reputation;
mod scanner;
pub mod scheduler;
pub mod tls;
pub mod verdict;
pub mod visual;
pub mod whois;

// Re-export public API
pub use config::{LogFormat, LogLevel, Settings, SettingsStore};
pub use error::{InitializationError, ScanError};
pub use models::{
    DetectorKind, Finding, ProviderCredentials, RiskTier, ScanReport, ScanRequest,
};
pub use scanner::{Scanner, ScannerBuilder};
