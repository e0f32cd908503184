#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for hotswap
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/hotswap/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod sections;

pub use crate::sections::{NetworkConfig, PathConfig, ProgressConfig, RuntimeConfig, SecurityConfig};

use constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DB_FILE_NAME, ENV_APP_VERSION, ENV_DEBUG,
    ENV_FRAME_INTERVAL_MS, ENV_PUBLIC_KEY, ENV_ROOT, ENV_TEST_CONFIGURATION,
};
use hotswap_errors::{ConfigError, Error, SigningError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_vars(|name| std::env::var(name).ok())
    }

    /// Merge values from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value of the wrong type.
    pub fn merge_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        if let Some(root) = lookup(ENV_ROOT) {
            self.paths.root_dir = Some(PathBuf::from(root));
        }

        if let Some(key) = lookup(ENV_PUBLIC_KEY) {
            self.security.public_key = Some(key);
        }

        if let Some(debug) = lookup(ENV_DEBUG) {
            self.runtime.debug_mode = parse_bool(ENV_DEBUG, debug)?;
        }

        if let Some(test) = lookup(ENV_TEST_CONFIGURATION) {
            self.runtime.test_configuration = parse_bool(ENV_TEST_CONFIGURATION, test)?;
        }

        if let Some(version) = lookup(ENV_APP_VERSION) {
            self.runtime.app_version_override = Some(version);
        }

        if let Some(interval) = lookup(ENV_FRAME_INTERVAL_MS) {
            self.progress.frame_interval_ms =
                interval.parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_FRAME_INTERVAL_MS.to_string(),
                    value: interval,
                })?;
        }

        Ok(())
    }

    /// Application-private root directory
    ///
    /// # Errors
    ///
    /// Returns an error if no root is configured and the platform data
    /// directory cannot be determined.
    pub fn root_dir(&self) -> Result<PathBuf, Error> {
        if let Some(root) = &self.paths.root_dir {
            return Ok(root.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| {
                ConfigError::MissingField {
                    field: "paths.root_dir".to_string(),
                }
                .into()
            })
    }

    /// Durable record database path
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be determined.
    pub fn db_path(&self) -> Result<PathBuf, Error> {
        match &self.paths.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(self.root_dir()?.join(DB_FILE_NAME)),
        }
    }

    /// The configured release public key, if any
    ///
    /// # Errors
    ///
    /// Returns an error if a key is configured but empty, or the key file
    /// cannot be read.
    pub async fn public_key(&self) -> Result<Option<String>, Error> {
        let raw = match (&self.security.public_key, &self.security.public_key_path) {
            (Some(key), _) => key.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?,
            (None, None) => return Ok(None),
        };

        if raw.trim().is_empty() {
            return Err(SigningError::InvalidPublicKey(
                "the configured public key is empty".to_string(),
            )
            .into());
        }
        Ok(Some(raw))
    }

    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.progress.frame_interval_ms)
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
