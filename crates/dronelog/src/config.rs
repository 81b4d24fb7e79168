//! Configuration management for dronelog.
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

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "dronelog";

/// Default table file name.
const DATABASE_FILE_NAME: &str = "flightlog.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "DRONELOG_";

/// Largest accepted per-operation store timeout, one hour.
pub const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DRONELOG_`, `__` between levels)
/// 2. TOML config file at `~/.config/dronelog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote table configuration.
    pub store: StoreConfig,
    /// History display configuration.
    pub display: DisplayConfig,
}

/// Which backend holds the flight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// A worksheet inside a shared `SQLite` file.
    #[default]
    Sqlite,
    /// A table held in process memory, gone when the process exits.
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Remote table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend holding the table.
    pub backend: StoreBackend,
    /// Path to the table file.
    /// Defaults to `~/.local/share/dronelog/flightlog.db`
    pub path: Option<PathBuf>,
    /// Worksheet holding the flight rows.
    pub worksheet: String,
    /// Upper bound on each read or write, in seconds.
    pub timeout_secs: u64,
}

/// History display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the most recent flight first.
    pub newest_first: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: None, // Will be resolved to default at runtime
            worksheet: "flights".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { newest_first: true }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(&config_file))
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
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
        if self.store.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "store.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.store.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::ConfigValidation {
                message: format!("store.timeout_secs must be at most {MAX_TIMEOUT_SECS}"),
            });
        }

        if self.store.worksheet.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "store.worksheet must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the table file path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the per-operation store timeout as a Duration.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }
}
