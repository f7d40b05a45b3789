//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - HTTP clients (general requests and manual redirect probing)
//! - DNS resolver
//! - Logger
//! - TLS crypto provider
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;
mod resolver;

pub use client::{init_client, init_probe_client};
pub use logger::init_logger_with;
pub use resolver::init_resolver;

use rustls::crypto::{ring::default_provider, CryptoProvider};

/// Initializes the crypto provider for TLS operations.
///
/// Configures the global crypto provider for `rustls`. This must be called
/// before any TLS connections are established. Uses the ring provider which
/// supports all standard TLS features.
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}
