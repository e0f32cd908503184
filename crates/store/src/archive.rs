//! Zip extraction for downloaded packages

use hotswap_errors::{Error, StorageError};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::task;

/// Extract `archive_path` into `dest_dir`, which is recreated empty first.
///
/// Entries whose names would escape `dest_dir` are skipped.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or a file cannot be written.
pub async fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    crate::fs::remove_path(dest_dir).await?;
    crate::fs::create_dir_all(dest_dir).await?;

    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    task::spawn_blocking(move || extract_zip_blocking(&archive_path, &dest_dir))
        .await
        .map_err(|e| StorageError::ExtractionFailed {
            message: format!("task join error: {e}"),
        })?
}

fn extract_zip_blocking(archive_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    let file = File::open(archive_path).map_err(|e| Error::io_with_path(&e, archive_path))?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(name = entry.name(), "skipping archive entry outside target");
            continue;
        };
        let outpath: PathBuf = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| Error::io_with_path(&e, &outpath))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let mut outfile =
            File::create(&outpath).map_err(|e| Error::io_with_path(&e, &outpath))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| StorageError::ExtractionFailed {
            message: format!("{}: {e}", entry.name()),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(())
}
