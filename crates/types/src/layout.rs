//! File and directory names of the on-disk package store

/// Directory under the application root holding every package
pub const UPDATES_DIR_NAME: &str = "Updates";
/// Subdirectory used instead of the store root in test configuration
pub const TEST_PACKAGES_DIR_NAME: &str = "TestPackages";
/// Pointer record naming the current and previous packages
pub const STATUS_FILE_NAME: &str = "status.json";
/// Metadata file inside each package directory
pub const METADATA_FILE_NAME: &str = "metadata.json";
/// Transient download target
pub const DOWNLOAD_FILE_NAME: &str = "download.zip";
/// Transient extraction directory
pub const UNZIPPED_DIR_NAME: &str = "unzipped";
/// Diff manifest at the root of a diff archive
pub const DIFF_MANIFEST_FILE_NAME: &str = "hotswap.json";
/// Release signature token shipped inside signed packages
pub const SIGNATURE_FILE_NAME: &str = ".hotswaprelease";
