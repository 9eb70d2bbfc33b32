//! Service configuration as operator-tunable TOML values
//!
//! Each struct implements `Default` with the values in `defaults`, so a
//! missing file or a partial file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SURVEY_COMPARE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "survey_compare.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `CompareConfig::load()` which searches:
/// 1. `$SURVEY_COMPARE_CONFIG`
/// 2. `./survey_compare.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub comparison: ComparisonConfig,

    #[serde(default)]
    pub adjustment: AdjustmentConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl CompareConfig {
    /// Load using the standard search order, falling back to defaults when a
    /// file is missing or broken.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every section, collecting all problems rather than stopping at
    /// the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "server.addr: '{}' is not a valid HOST:PORT socket address",
                self.server.addr
            ));
        }

        let res = self.comparison.default_resolution;
        if !(defaults::MIN_RESOLUTION_M..=defaults::MAX_RESOLUTION_M).contains(&res) {
            errors.push(format!(
                "comparison.default_resolution: {res} must be between {} and {}",
                defaults::MIN_RESOLUTION_M,
                defaults::MAX_RESOLUTION_M
            ));
        }

        if let Some(max_offset) = self.adjustment.max_abs_offset_m {
            if !max_offset.is_finite() || max_offset <= 0.0 {
                errors.push(format!(
                    "adjustment.max_abs_offset_m: {max_offset} must be a positive finite number"
                ));
            }
        }

        if self.storage.backend == StorageBackend::Sled
            && self.storage.data_dir.as_os_str().is_empty()
        {
            errors.push("storage.data_dir: must be set for the sled backend".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_addr() -> String {
    defaults::DEFAULT_SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Grid step used when a request does not specify one (m)
    #[serde(default = "default_resolution")]
    pub default_resolution: u32,
}

fn default_resolution() -> u32 {
    defaults::DEFAULT_RESOLUTION_M
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            default_resolution: default_resolution(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    /// Optional per-axis bound on a single offset (m). Unset means any
    /// finite offset is accepted.
    #[serde(default)]
    pub max_abs_offset_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Persistent sled database under `data_dir`
    Sled,
    /// Process-local maps, lost on restart
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sled
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_DATA_DIR)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CompareConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.comparison.default_resolution, 5);
        assert_eq!(config.storage.backend, StorageBackend::Sled);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = CompareConfig::from_toml_str(
            r#"
            [comparison]
            default_resolution = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.comparison.default_resolution, 10);
        assert_eq!(config.server.addr, defaults::DEFAULT_SERVER_ADDR);
        assert_eq!(config.adjustment.max_abs_offset_m, None);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let err = CompareConfig::from_toml_str(
            r#"
            [server]
            addr = "not-an-address"
            [comparison]
            default_resolution = 0
            [adjustment]
            max_abs_offset_m = -1.0
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_memory_backend_parses() {
        let config = CompareConfig::from_toml_str(
            r#"
            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CompareConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(CompareConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[comparison\n").unwrap();
        let err = CompareConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"), "{err}");
    }
}
