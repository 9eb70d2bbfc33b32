//! Service Configuration Module
//!
//! Settings loaded from TOML, replacing hardcoded limits with operator-tunable
//! values.
//!
//! ## Loading Order
//!
//! 1. `SURVEY_COMPARE_CONFIG` environment variable (path to TOML file)
//! 2. `survey_compare.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(CompareConfig::load());
//! let step = config::get().comparison.default_resolution;
//! ```

mod survey_config;
pub mod defaults;

pub use survey_config::*;

use std::sync::OnceLock;

static COMPARE_CONFIG: OnceLock<CompareConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored.
pub fn init(config: CompareConfig) {
    if COMPARE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// The global configuration, or built-in defaults before `init()`.
pub fn get() -> &'static CompareConfig {
    COMPARE_CONFIG.get_or_init(CompareConfig::default)
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    COMPARE_CONFIG.get().is_some()
}
