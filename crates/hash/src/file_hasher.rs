//! Recursive hashing of a package directory
//!
//! Files are collected first, then hashed with bounded concurrency. Results
//! are sorted by relative path so output never depends on directory
//! iteration order.

use crate::Hash;
use hotswap_errors::{Error, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Result of hashing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashResult {
    /// `/`-separated path relative to the hashed directory
    pub relative_path: String,
    /// BLAKE3 hash of the file contents (of the link target for symlinks)
    pub hash: Hash,
    pub size: u64,
    pub is_symlink: bool,
}

/// Configuration for file hashing operations
#[derive(Debug, Clone)]
pub struct FileHasherConfig {
    /// Maximum number of concurrent hash operations
    pub max_concurrency: usize,
    /// Relative paths rejected by this filter are skipped
    pub skip: fn(&str) -> bool,
}

impl Default for FileHasherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            skip: |_| false,
        }
    }
}

/// File hasher for processing whole directory trees
#[derive(Debug, Clone)]
pub struct FileHasher {
    config: FileHasherConfig,
}

impl FileHasher {
    #[must_use]
    pub fn new(config: FileHasherConfig) -> Self {
        Self { config }
    }

    /// Hash a single file relative to `base_path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or metadata cannot be accessed
    pub async fn hash_entry(path: &Path, base_path: &Path) -> Result<FileHashResult, Error> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, path))?;
        let relative_path = relative_slash_path(path, base_path)?;

        if metadata.is_symlink() {
            let target = tokio::fs::read_link(path).await?;
            let target_string = target.to_string_lossy().to_string();
            let target_bytes = target_string.as_bytes();
            return Ok(FileHashResult {
                relative_path,
                hash: Hash::from_data(target_bytes),
                size: target_bytes.len() as u64,
                is_symlink: true,
            });
        }

        Ok(FileHashResult {
            relative_path,
            hash: Hash::hash_file(path).await?,
            size: metadata.len(),
            is_symlink: false,
        })
    }

    /// Hash all files in a directory recursively
    ///
    /// # Errors
    /// Returns an error if directory traversal fails or file operations fail
    pub async fn hash_directory(&self, dir_path: &Path) -> Result<Vec<FileHashResult>, Error> {
        let mut files = Vec::new();
        collect_files(dir_path, dir_path, self.config.skip, &mut files).await?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let base_path = Arc::new(dir_path.to_path_buf());
        let mut tasks = JoinSet::new();

        for file_path in files {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| StorageError::IoError {
                    message: format!("semaphore acquire error: {e}"),
                })?;
            let base_path = Arc::clone(&base_path);
            tasks.spawn(async move {
                let _permit = permit;
                Self::hash_entry(&file_path, &base_path).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| StorageError::IoError {
                message: format!("task join error: {e}"),
            })??;
            results.push(result);
        }

        results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(results)
    }
}

fn relative_slash_path(path: &Path, base_path: &Path) -> Result<String, Error> {
    let relative = path
        .strip_prefix(base_path)
        .map_err(|_| StorageError::InvalidPath {
            path: path.display().to_string(),
        })?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

async fn collect_files(
    base_path: &Path,
    current_path: &Path,
    skip: fn(&str) -> bool,
    out: &mut Vec<PathBuf>,
) -> Result<(), Error> {
    let mut entries = tokio::fs::read_dir(current_path)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, current_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let relative = relative_slash_path(&path, base_path)?;
        let file_type = entry.file_type().await?;

        if file_type.is_dir() {
            if skip(&format!("{relative}/")) {
                continue;
            }
            Box::pin(collect_files(base_path, &path, skip, out)).await?;
        } else if !skip(&relative) {
            out.push(path);
        }
    }

    Ok(())
}
