//! Settings types and the process-wide settings store.

use std::sync::{Arc, RwLock};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Scan-time thresholds read by the detectors.
///
/// Detectors read these at scan time rather than caching them per scan, so an
/// update takes effect for the next scan immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Domains younger than this many days are flagged as "new".
    pub min_domain_age_days: i64,
    /// Shannon-entropy threshold above which a domain is flagged.
    pub max_entropy_threshold: f64,
    /// Maximum distinct countries a redirect chain may cross.
    pub jurisdiction_jump_limit: usize,
    /// Enables the optional vision-classification pass of the visual analyzer.
    pub enable_vision_ai: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_domain_age_days: 30,
            max_entropy_threshold: 4.0,
            jurisdiction_jump_limit: 3,
            enable_vision_ai: false,
        }
    }
}

/// Cheaply clonable handle to the process-wide [`Settings`].
///
/// Settings are shared explicitly (the handle is injected into the scanner)
/// rather than living in ambient global state.
#[derive(Clone, Debug, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    /// Creates a store seeded with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Returns a snapshot of the current settings.
    ///
    /// A poisoned lock falls back to defaults rather than panicking; the
    /// store only ever holds plain threshold values.
    pub fn get(&self) -> Settings {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Applies an in-place update to the settings.
    pub fn update(&self, apply: impl FnOnce(&mut Settings)) {
        if let Ok(mut guard) = self.inner.write() {
            apply(&mut guard);
        }
    }
}
