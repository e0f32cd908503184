//! Update package metadata

use hotswap_errors::StateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata describing one update package.
///
/// Known fields are typed; anything else the server sends is preserved in
/// `extra` and written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    /// Content hash identifying the package
    #[serde(default)]
    pub package_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_size: Option<u64>,
    /// Build marker of the binary that downloaded this package, as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_modified_time: Option<String>,
    /// Relative path of the entry file inside the package directory
    #[serde(
        default,
        rename = "bundlePath",
        alias = "relativeBundlePath",
        skip_serializing_if = "Option::is_none"
    )]
    pub relative_bundle_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageMetadata {
    /// Metadata with only a hash set
    pub fn new(package_hash: impl Into<String>) -> Self {
        Self {
            package_hash: package_hash.into(),
            download_url: None,
            app_version: None,
            label: None,
            description: None,
            is_mandatory: false,
            package_size: None,
            binary_modified_time: None,
            relative_bundle_path: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn has_hash(&self) -> bool {
        !self.package_hash.is_empty()
    }

    /// Parse the recorded binary build marker
    ///
    /// # Errors
    ///
    /// Returns a corrupt-record error if the marker is present but not a number.
    pub fn binary_build_marker(&self) -> Result<Option<u64>, StateError> {
        self.binary_modified_time
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| StateError::CorruptRecord {
                        key: "binaryModifiedTime".to_string(),
                        message: format!("{raw:?} for package {}: {e}", self.package_hash),
                    })
            })
            .transpose()
    }
}

/// Shape of a downloaded payload, decided from its leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Zip archive of a full or diff package
    Archive,
    /// A single entry file
    RawBundle,
}

impl PayloadKind {
    /// Local file header signature of a zip archive
    pub const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

    #[must_use]
    pub fn from_header(header: &[u8]) -> Self {
        if header.len() >= 4 && header[..4] == Self::ZIP_MAGIC {
            Self::Archive
        } else {
            Self::RawBundle
        }
    }
}
