//! Deterministic hash of an update package directory

use crate::{FileHasher, FileHasherConfig, Hash};
use hotswap_errors::Error;
use hotswap_types::layout::SIGNATURE_FILE_NAME;
use std::path::Path;

/// Paths that never take part in a package hash
#[must_use]
pub fn is_ignored_path(relative_path: &str) -> bool {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    relative_path.starts_with("__MACOSX/")
        || file_name == ".DS_Store"
        || relative_path == SIGNATURE_FILE_NAME
}

/// Sorted `path:hash` entries describing every hashed file of a package
///
/// # Errors
/// Returns an error if the directory cannot be walked or a file cannot be read.
pub async fn package_manifest(dir: &Path) -> Result<Vec<String>, Error> {
    let hasher = FileHasher::new(FileHasherConfig {
        skip: is_ignored_path,
        ..FileHasherConfig::default()
    });
    let mut entries: Vec<String> = hasher
        .hash_directory(dir)
        .await?
        .into_iter()
        .map(|r| format!("{}:{}", r.relative_path, r.hash.to_hex()))
        .collect();
    entries.sort();
    Ok(entries)
}

/// Hash identifying a package's contents
///
/// The hash covers the JSON encoding of [`package_manifest`], so it is
/// independent of iteration order and platform path separators.
///
/// # Errors
/// Returns an error if the directory cannot be walked or a file cannot be read.
pub async fn compute_package_hash(dir: &Path) -> Result<Hash, Error> {
    let manifest = package_manifest(dir).await?;
    let encoded = serde_json::to_vec(&manifest)?;
    Ok(Hash::from_data(&encoded))
}
