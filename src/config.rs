//! Configuration management for Sharenite Mirror
//!
//! One TOML file configures every component. Missing sections and fields fall
//! back to defaults, so an empty file (or no file at all) is a valid setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig, LookupConfig, SyncConfig};
use crate::constants::{env, logging};
use crate::errors::{ConfigError, Result};

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sharenite profile to mirror (falls back to `SHARENITE_USERNAME`)
    pub username: Option<String>,
    /// Persistent store settings
    pub store: StoreConfig,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Synchronization engine settings
    pub sync: SyncConfig,
    /// Cover lookup cache settings
    pub cache: CacheConfig,
    /// Cover provider settings
    pub lookup: LookupConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the key-value store keeps its files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory (None = user config directory)
    pub root: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no CLI verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with precedence:
    /// 1. Explicit `--config` file (must exist)
    /// 2. `./sharenite-mirror.toml`
    /// 3. The user config directory
    /// 4. Defaults
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) if path.exists() => Some(path),
            Some(path) => return Err(ConfigError::NotFound { path }.into()),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file in the standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./sharenite-mirror.toml")];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sharenite-mirror").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::Io)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::InvalidValue {
            field: field.to_string(),
            reason,
        };

        self.client
            .validate()
            .map_err(|reason| invalid("client", reason))?;
        self.sync.validate().map_err(|reason| invalid("sync", reason))?;
        self.cache
            .validate()
            .map_err(|reason| invalid("cache", reason))?;
        self.lookup
            .validate()
            .map_err(|reason| invalid("lookup", reason))?;

        if let Some(username) = &self.username {
            if username.trim().is_empty() {
                return Err(invalid("username", "must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Profile to mirror: explicit argument, then config, then environment
    pub fn resolve_username(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.username.clone())
            .or_else(|| std::env::var(env::USERNAME).ok())
            .filter(|name| !name.trim().is_empty())
    }
}
