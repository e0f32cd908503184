#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the hotswap update engine
//!
//! This crate provides the data model shared by every other crate: package
//! metadata, the persisted pointer and pending records, the install state
//! machine's states and download progress.

pub mod layout;
pub mod package;
pub mod progress;
pub mod state;

pub use package::{PackageMetadata, PayloadKind};
pub use progress::DownloadProgress;
pub use state::{InstallState, PendingUpdate, PointerRecord, UpdateState};

use serde::{Deserialize, Serialize};

/// Identity of the running host binary, supplied by the embedding layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryInfo {
    /// Build marker of the binary (modification time of its bundled entry file)
    pub build_marker: u64,
    /// Application version string of the binary
    pub app_version: String,
}

impl BinaryInfo {
    #[must_use]
    pub fn new(build_marker: u64, app_version: impl Into<String>) -> Self {
        Self {
            build_marker,
            app_version: app_version.into(),
        }
    }
}

/// Where the host should load its entry file from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// The entry file shipped inside the binary
    Binary,
    /// An entry file inside the current update package
    Package(std::path::PathBuf),
}
