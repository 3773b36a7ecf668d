//! Configuration management for fieldpin.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::UNKNOWN_FIELD_LABEL;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fieldpin";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "pins.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FIELDPIN_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/fieldpin/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Reconciliation engine configuration.
    pub engine: EngineConfig,
    /// Value suggestion configuration.
    pub suggestions: SuggestionConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/fieldpin/pins.db`
    pub database_path: Option<PathBuf>,
}

/// Reconciliation engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Merge pins into the selected field list.
    pub pin_mode: bool,
    /// Label shown for fields missing from the catalog.
    pub unknown_label: String,
}

/// Value suggestion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Queries shorter than this return no suggestions.
    pub min_query_length: usize,
    /// Maximum number of suggestions returned.
    pub max_results: usize,
    /// Lookup timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pin_mode: true,
            unknown_label: UNKNOWN_FIELD_LABEL.to_string(),
        }
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_query_length: 1,
            max_results: 10,
            timeout_ms: 3_000,
        }
    }
}

impl SuggestionConfig {
    /// Get the lookup timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FIELDPIN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.engine.unknown_label.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "unknown_label must not be empty".to_string(),
            });
        }

        if self.suggestions.max_results == 0 {
            return Err(Error::ConfigValidation {
                message: "max_results must be greater than 0".to_string(),
            });
        }

        if self.suggestions.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.engine.pin_mode);
        assert_eq!(config.engine.unknown_label, "Campo Desconocido");
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_default_suggestion_config() {
        let suggestions = SuggestionConfig::default();

        assert_eq!(suggestions.min_query_length, 1);
        assert_eq!(suggestions.max_results, 10);
        assert_eq!(suggestions.timeout(), Duration::from_millis(3_000));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_blank_unknown_label() {
        let mut config = Config::default();
        config.engine.unknown_label = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("unknown_label"));
    }

    #[test]
    fn test_validate_zero_max_results() {
        let mut config = Config::default();
        config.suggestions.max_results = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_results"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.suggestions.timeout_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_ms"));
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("pins.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("fieldpin"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("fieldpin_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[engine]\npin_mode = false\nunknown_label = \"Unknown field\"\n\n[suggestions]\nmax_results = 3\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert!(!config.engine.pin_mode);
        assert_eq!(config.engine.unknown_label, "Unknown field");
        assert_eq!(config.suggestions.max_results, 3);
        assert_eq!(config.suggestions.timeout_ms, 3_000);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "fieldpin_bad_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[suggestions]\nmax_results = 0\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_engine_config_deserialize_partial() {
        let json = r#"{"pin_mode": false}"#;
        let engine: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(!engine.pin_mode);
        assert_eq!(engine.unknown_label, UNKNOWN_FIELD_LABEL);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("unknown_label"));
        assert!(json.contains("max_results"));
    }
}
