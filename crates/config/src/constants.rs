//! Fixed names used when no configuration overrides them

/// Directory name under the platform data/config directories
pub const APP_DIR_NAME: &str = "hotswap";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "hotswap.sqlite";
pub const DEFAULT_ENTRY_FILE_NAME: &str = "index.bundle";

pub const ENV_ROOT: &str = "HOTSWAP_ROOT";
pub const ENV_PUBLIC_KEY: &str = "HOTSWAP_PUBLIC_KEY";
pub const ENV_DEBUG: &str = "HOTSWAP_DEBUG";
pub const ENV_TEST_CONFIGURATION: &str = "HOTSWAP_TEST_CONFIGURATION";
pub const ENV_APP_VERSION: &str = "HOTSWAP_APP_VERSION";
pub const ENV_FRAME_INTERVAL_MS: &str = "HOTSWAP_FRAME_INTERVAL_MS";
