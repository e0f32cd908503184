#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! On-disk package store for hotswap
//!
//! This crate manages the `Updates/` directory under the application root.
//! Every package lives in a directory named by its hash, and `status.json`
//! names which package is current and which one is kept for rollback. At
//! most those two package directories are referenced at any time.

pub mod archive;
pub mod bundle;
pub mod diff;
pub mod fs;

pub use archive::extract_zip;
pub use bundle::find_entry_file;
pub use diff::{copy_retained_files, overlay, read_diff_manifest, DiffManifest};

use hotswap_errors::{Error, StorageError};
use hotswap_events::{AppEvent, EventEmitter, EventSender, UpdateEvent};
use hotswap_types::layout::{
    DOWNLOAD_FILE_NAME, METADATA_FILE_NAME, STATUS_FILE_NAME, TEST_PACKAGES_DIR_NAME,
    UNZIPPED_DIR_NAME, UPDATES_DIR_NAME,
};
use hotswap_types::{PackageMetadata, PointerRecord};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Store manager for installed update packages
#[derive(Clone, Debug)]
pub struct PackageStore {
    root: PathBuf,
    tx: Option<EventSender>,
}

impl EventEmitter for PackageStore {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl PackageStore {
    /// Create a store under `app_root`
    ///
    /// Test configurations keep their packages apart from real ones.
    #[must_use]
    pub fn new(app_root: &Path, test_configuration: bool) -> Self {
        let mut root = app_root.join(UPDATES_DIR_NAME);
        if test_configuration {
            root.push(TEST_PACKAGES_DIR_NAME);
        }
        Self { root, tx: None }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the package named `hash`
    #[must_use]
    pub fn package_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    #[must_use]
    pub fn metadata_path(&self, hash: &str) -> PathBuf {
        self.package_path(hash).join(METADATA_FILE_NAME)
    }

    #[must_use]
    pub fn download_file_path(&self) -> PathBuf {
        self.root.join(DOWNLOAD_FILE_NAME)
    }

    #[must_use]
    pub fn unzipped_path(&self) -> PathBuf {
        self.root.join(UNZIPPED_DIR_NAME)
    }

    fn status_path(&self) -> PathBuf {
        self.root.join(STATUS_FILE_NAME)
    }

    /// Package directory for `hash`, refusing names that are not one path component
    fn checked_package_path(&self, hash: &str) -> Result<PathBuf, Error> {
        let mut components = Path::new(hash).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.package_path(hash)),
            _ => Err(StorageError::InvalidPath {
                path: hash.to_string(),
            }
            .into()),
        }
    }

    /// Read the pointer record; a missing file is an empty record
    ///
    /// # Errors
    ///
    /// Returns a corrupt-data error if `status.json` exists but cannot be parsed.
    pub async fn pointers(&self) -> Result<PointerRecord, Error> {
        let path = self.status_path();
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PointerRecord::default()),
            Err(e) => return Err(Error::io_with_path(&e, &path)),
        };

        serde_json::from_slice(&raw).map_err(|e| {
            StorageError::CorruptedData {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Replace the pointer record atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub async fn save_pointers(&self, pointers: &PointerRecord) -> Result<(), Error> {
        let encoded = serde_json::to_vec_pretty(pointers)?;
        fs::write_atomic(&self.status_path(), &encoded).await
    }

    /// # Errors
    ///
    /// Returns an error if the pointer record cannot be read.
    pub async fn current_package_hash(&self) -> Result<Option<String>, Error> {
        Ok(self.pointers().await?.current_package)
    }

    /// # Errors
    ///
    /// Returns an error if the pointer record cannot be read.
    pub async fn previous_package_hash(&self) -> Result<Option<String>, Error> {
        Ok(self.pointers().await?.previous_package)
    }

    /// # Errors
    ///
    /// Returns an error if the pointer record cannot be read.
    pub async fn current_package_path(&self) -> Result<Option<PathBuf>, Error> {
        Ok(self
            .current_package_hash()
            .await?
            .map(|hash| self.package_path(&hash)))
    }

    /// Metadata of the package named `hash`.
    ///
    /// `None` when the package has no metadata file, or when the file cannot
    /// be parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if `hash` is not a valid package name or the file
    /// exists but cannot be read.
    pub async fn get_package(&self, hash: &str) -> Result<Option<PackageMetadata>, Error> {
        let path = self.checked_package_path(hash)?.join(METADATA_FILE_NAME);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io_with_path(&e, &path)),
        };

        match serde_json::from_slice::<PackageMetadata>(&raw) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                tracing::warn!(hash, error = %e, "unable to parse package metadata");
                self.emit_warning_with_context(
                    format!("unreadable metadata for package {hash}"),
                    e.to_string(),
                );
                Ok(None)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the pointer record or metadata cannot be read.
    pub async fn get_current_package(&self) -> Result<Option<PackageMetadata>, Error> {
        match self.current_package_hash().await? {
            Some(hash) => self.get_package(&hash).await,
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the pointer record or metadata cannot be read.
    pub async fn get_previous_package(&self) -> Result<Option<PackageMetadata>, Error> {
        match self.previous_package_hash().await? {
            Some(hash) => self.get_package(&hash).await,
            None => Ok(None),
        }
    }

    /// Absolute path of the current package's entry file
    ///
    /// Uses the recorded bundle path, falling back to `entry_file_name` at the
    /// package root.
    ///
    /// # Errors
    ///
    /// Returns an error if the pointer record or metadata cannot be read.
    pub async fn current_bundle_path(
        &self,
        entry_file_name: &str,
    ) -> Result<Option<PathBuf>, Error> {
        let Some(hash) = self.current_package_hash().await? else {
            return Ok(None);
        };
        let package_dir = self.package_path(&hash);
        let relative = self
            .get_package(&hash)
            .await?
            .and_then(|meta| meta.relative_bundle_path)
            .unwrap_or_else(|| entry_file_name.to_string());

        Ok(Some(package_dir.join(relative)))
    }

    /// Write `metadata.json` into the package directory named by `meta`
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is invalid or the file cannot be written.
    pub async fn write_package_metadata(&self, meta: &PackageMetadata) -> Result<(), Error> {
        let path = self
            .checked_package_path(&meta.package_hash)?
            .join(METADATA_FILE_NAME);
        let encoded = serde_json::to_vec_pretty(meta)?;
        fs::write_atomic(&path, &encoded).await
    }

    /// Delete a package directory; a missing directory is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is invalid or removal fails.
    pub async fn remove_package_dir(&self, hash: &str) -> Result<(), Error> {
        let path = self.checked_package_path(hash)?;
        fs::remove_path(&path).await
    }

    /// Make `meta` the current package.
    ///
    /// With `discard_current` the running package is deleted and the
    /// rollback target stays as it was; otherwise the running package becomes
    /// the rollback target and the old rollback target is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is invalid, a directory cannot be
    /// removed, or the pointer record cannot be read or written.
    pub async fn install_package(
        &self,
        meta: &PackageMetadata,
        discard_current: bool,
    ) -> Result<(), Error> {
        let hash = meta.package_hash.as_str();
        self.checked_package_path(hash)?;

        let mut pointers = self.pointers().await?;
        if pointers.current_package.as_deref() == Some(hash) {
            tracing::debug!(hash, "package already current");
            return Ok(());
        }

        if discard_current {
            if let Some(current) = pointers.current_package.take() {
                self.remove_package_dir(&current).await?;
            }
        } else {
            if let Some(previous) = pointers.previous_package.as_deref() {
                if previous != hash {
                    self.remove_package_dir(previous).await?;
                }
            }
            pointers.previous_package = pointers.current_package.take();
        }
        pointers.current_package = Some(hash.to_string());

        self.save_pointers(&pointers).await?;

        tracing::info!(
            hash,
            previous = pointers.previous_package.as_deref(),
            discard_current,
            "installed package"
        );
        self.emit(AppEvent::Update(UpdateEvent::Installed {
            hash: hash.to_string(),
            previous: pointers.previous_package,
            discarded_current: discard_current,
        }));
        Ok(())
    }

    /// Delete the current package and restore the previous one.
    ///
    /// Returns the restored hash, if there was a previous package.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be removed or the
    /// pointer record cannot be read or written.
    pub async fn rollback_package(&self) -> Result<Option<String>, Error> {
        let mut pointers = self.pointers().await?;
        let failed = pointers.current_package.take();
        if let Some(failed) = failed.as_deref() {
            self.remove_package_dir(failed).await?;
        }
        pointers.current_package = pointers.previous_package.take();

        self.save_pointers(&pointers).await?;

        if let Some(failed_hash) = failed {
            tracing::warn!(
                failed = failed_hash.as_str(),
                restored = pointers.current_package.as_deref(),
                "rolled back package"
            );
            self.emit(AppEvent::Update(UpdateEvent::RolledBack {
                failed_hash,
                restored: pointers.current_package.clone(),
            }));
        }
        Ok(pointers.current_package)
    }

    /// Delete every package along with the pointer record
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be removed.
    pub async fn clear_updates(&self) -> Result<(), Error> {
        fs::remove_path(&self.root).await?;
        tracing::info!(root = %self.root.display(), "cleared package store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_test_configuration_root() {
        let store = PackageStore::new(Path::new("/data/app"), true);
        assert_eq!(store.root(), Path::new("/data/app/Updates/TestPackages"));
        let store = PackageStore::new(Path::new("/data/app"), false);
        assert_eq!(store.root(), Path::new("/data/app/Updates"));
    }

    #[tokio::test]
    async fn test_rejects_path_like_hashes() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path(), false);
        for hash in ["../escape", "a/b", "", "."] {
            assert!(store.remove_package_dir(hash).await.is_err(), "{hash}");
        }
    }

    #[tokio::test]
    async fn test_corrupt_status_is_error() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path(), false);
        tokio::fs::create_dir_all(store.root()).await.unwrap();
        tokio::fs::write(store.root().join(STATUS_FILE_NAME), b"{oops")
            .await
            .unwrap();

        let err = store.pointers().await.unwrap_err();
        assert_eq!(err.kind(), hotswap_errors::ErrorKind::CorruptRecord);
    }

    #[tokio::test]
    async fn test_unparseable_metadata_reads_as_none() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path(), false);
        tokio::fs::create_dir_all(store.package_path("h1"))
            .await
            .unwrap();
        tokio::fs::write(store.metadata_path("h1"), b"not json")
            .await
            .unwrap();
        assert!(store.get_package("h1").await.unwrap().is_none());
    }
}
