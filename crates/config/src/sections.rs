//! Configuration sections and their defaults

use crate::constants::DEFAULT_ENTRY_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Application-private root holding the package store
    pub root_dir: Option<PathBuf>,
    /// Durable record database, defaults to a file under `root_dir`
    pub db_path: Option<PathBuf>,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// Minisign public key, as the base64 key line
    pub public_key: Option<String>,
    /// File holding the public key, read when `public_key` is unset
    pub public_key_path: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Download progress reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_notify")]
    pub notify: bool,
    /// Minimum spacing of progress deliveries
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            notify: default_notify(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

/// Runtime behaviour of the update session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Debug sessions keep stale updates on disk
    #[serde(default)]
    pub debug_mode: bool,
    /// Test configuration isolates packages and skips the app-version check
    #[serde(default)]
    pub test_configuration: bool,
    /// Report this app version instead of the binary's
    #[serde(default)]
    pub app_version_override: Option<String>,
    #[serde(default = "default_entry_file_name")]
    pub entry_file_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            test_configuration: false,
            app_version_override: None,
            entry_file_name: default_entry_file_name(),
        }
    }
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("hotswap/{}", env!("CARGO_PKG_VERSION"))
}

fn default_notify() -> bool {
    true
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_entry_file_name() -> String {
    DEFAULT_ENTRY_FILE_NAME.to_string()
}
