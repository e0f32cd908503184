//! Filesystem helpers for the package store

use hotswap_errors::{Error, StorageError};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

type Result<T> = std::result::Result<T, Error>;

/// Whether a path exists; unreadable paths count as absent
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Create a directory with all parent directories
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, path).into())
}

/// Remove a file or directory tree; a missing path is not an error
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub async fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(StorageError::from_io_with_path(&e, path).into()),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::from_io_with_path(&e, path).into()),
    }
}

/// Recursively copy `src` into `dst`, overwriting files that already exist.
///
/// `skip` receives the `/`-separated path relative to `src`; entries it
/// accepts are not copied (directories are skipped whole).
///
/// # Errors
///
/// Returns an error if reading the source or writing the destination fails.
pub async fn copy_directory(
    src: &Path,
    dst: &Path,
    skip: &(dyn Fn(&str) -> bool + Sync),
) -> Result<()> {
    copy_directory_inner(src, dst, "", skip).await
}

async fn copy_directory_inner(
    src: &Path,
    dst: &Path,
    prefix: &str,
    skip: &(dyn Fn(&str) -> bool + Sync),
) -> Result<()> {
    create_dir_all(dst).await?;

    let mut entries = fs::read_dir(src)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, src))?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if skip(&relative) {
            continue;
        }

        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type().await?;

        if file_type.is_dir() {
            if !matches!(fs::metadata(&dst_path).await, Ok(m) if m.is_dir()) {
                remove_path(&dst_path).await?;
            }
            Box::pin(copy_directory_inner(&src_path, &dst_path, &relative, skip)).await?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&src_path).await?;
            remove_path(&dst_path).await?;
            symlink(&target, &dst_path).await?;
        } else {
            if matches!(fs::metadata(&dst_path).await, Ok(m) if m.is_dir()) {
                remove_path(&dst_path).await?;
            }
            fs::copy(&src_path, &dst_path)
                .await
                .map_err(|e| StorageError::from_io_with_path(&e, &dst_path))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> Result<()> {
    fs::symlink(target, link)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, link).into())
}

#[cfg(not(unix))]
async fn symlink(target: &Path, link: &Path) -> Result<()> {
    fs::copy(target, link)
        .await
        .map(|_| ())
        .map_err(|e| StorageError::from_io_with_path(&e, link).into())
}

/// Move a file, falling back to copy and delete across filesystems
///
/// # Errors
///
/// Returns an error if the file cannot be moved.
pub async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        create_dir_all(parent).await?;
    }
    if fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }
    fs::copy(src, dst)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, dst))?;
    remove_path(src).await
}

/// Replace `path` with `contents` so readers see either the old or new file
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or renamed.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| StorageError::InvalidPath {
        path: path.display().to_string(),
    })?;
    create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    if let Err(e) = write_synced(&tmp_path, contents).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StorageError::from_io_with_path(&e, &tmp_path).into());
    }

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(StorageError::AtomicRenameFailed {
            message: format!("{}: {e}", path.display()),
        }
        .into());
    }
    sync_dir(parent).await
}

/// Write and flush `contents` to stable storage
async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

/// Persist directory entries so a completed rename survives power loss
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let handle = fs::File::open(dir)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, dir))?;
    handle
        .sync_all()
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, dir).into())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
