//! Diff packages: carry unchanged files over from the running package

use crate::fs;
use hotswap_errors::Error;
use hotswap_types::layout::{DIFF_MANIFEST_FILE_NAME, METADATA_FILE_NAME, SIGNATURE_FILE_NAME};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of the diff manifest shipped at the root of a diff archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffManifest {
    #[serde(default)]
    pub deleted_files: Vec<String>,
}

impl DiffManifest {
    /// Whether `relative` was deleted, directly or through a deleted parent
    #[must_use]
    pub fn is_deleted(&self, relative: &str) -> bool {
        self.deleted_files.iter().any(|deleted| {
            let deleted = deleted.trim_matches('/');
            relative == deleted
                || relative
                    .strip_prefix(deleted)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Read the diff manifest from an extracted archive, if it has one
///
/// # Errors
///
/// Returns `InvalidUpdate` if the manifest exists but cannot be parsed.
pub async fn read_diff_manifest(unzipped_dir: &Path) -> Result<Option<DiffManifest>, Error> {
    let path = unzipped_dir.join(DIFF_MANIFEST_FILE_NAME);
    if !fs::exists(&path).await {
        return Ok(None);
    }

    let raw = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::io_with_path(&e, &path))?;
    let manifest = serde_json::from_slice(&raw)
        .map_err(|e| Error::invalid_update(format!("unreadable diff manifest: {e}")))?;
    Ok(Some(manifest))
}

/// Copy the files of `current_dir` that the diff keeps into `new_dir`.
///
/// The old package's metadata and release token never carry over.
///
/// # Errors
///
/// Returns an error if copying fails.
pub async fn copy_retained_files(
    manifest: &DiffManifest,
    current_dir: &Path,
    new_dir: &Path,
) -> Result<(), Error> {
    if !fs::exists(current_dir).await {
        tracing::debug!("no current package to apply diff against");
        return fs::create_dir_all(new_dir).await;
    }

    let skip = |relative: &str| {
        relative == METADATA_FILE_NAME
            || relative == SIGNATURE_FILE_NAME
            || manifest.is_deleted(relative)
    };
    fs::copy_directory(current_dir, new_dir, &skip).await
}

/// Copy the extracted archive over `new_dir`; archive files win
///
/// # Errors
///
/// Returns an error if copying fails.
pub async fn overlay(unzipped_dir: &Path, new_dir: &Path) -> Result<(), Error> {
    fs::copy_directory(unzipped_dir, new_dir, &|relative| {
        relative == DIFF_MANIFEST_FILE_NAME
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_directory_covers_children() {
        let manifest = DiffManifest {
            deleted_files: vec!["assets/old".into(), "a.txt".into()],
        };
        assert!(manifest.is_deleted("a.txt"));
        assert!(manifest.is_deleted("assets/old/icon.png"));
        assert!(!manifest.is_deleted("assets/older.png"));
        assert!(!manifest.is_deleted("b.txt"));
    }

    #[tokio::test]
    async fn test_unparseable_manifest_is_invalid_update() {
        let temp = tempfile::TempDir::new().unwrap();
        tokio::fs::write(temp.path().join(DIFF_MANIFEST_FILE_NAME), b"[1,")
            .await
            .unwrap();
        let err = read_diff_manifest(temp.path()).await.unwrap_err();
        assert_eq!(err.kind(), hotswap_errors::ErrorKind::InvalidUpdate);
    }
}
