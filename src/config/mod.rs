//! Configuration: constants, tunable settings and the settings store.
//!
//! This module provides:
//! - Operational constants (timeouts, hop limits, risk lists)
//! - The [`Settings`] struct of scan-time thresholds
//! - [`SettingsStore`], a process-wide, explicitly shared settings handle

mod constants;
mod types;

pub use constants::*;
pub use types::{LogFormat, LogLevel, Settings, SettingsStore};
