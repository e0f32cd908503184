//! Builds a verified package directory from a download

use crate::verification::verify_package;
use hotswap_errors::{Error, NetworkError};
use hotswap_events::{AppEvent, EventEmitter, EventSender, UpdateEvent};
use hotswap_net::{download_payload, NetClient, ProgressThrottle};
use hotswap_signing::ReleaseKey;
use hotswap_store::{fs, PackageStore};
use hotswap_types::layout::METADATA_FILE_NAME;
use hotswap_types::{PackageMetadata, PayloadKind};
use std::path::PathBuf;

/// Removes paths on drop until disarmed
struct CleanupGuard {
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    fn disarm(&mut self) {
        self.paths.clear();
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            // Best-effort cleanup - ignore errors
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Downloads packages into a [`PackageStore`]
#[derive(Clone, Debug)]
pub struct PackageDownloader {
    store: PackageStore,
    client: NetClient,
    tx: Option<EventSender>,
}

impl EventEmitter for PackageDownloader {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl PackageDownloader {
    #[must_use]
    pub fn new(store: PackageStore, client: NetClient) -> Self {
        Self {
            store,
            client,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Download, stage and verify the package described by `meta`.
    ///
    /// Diff archives are merged with the package that is current when the
    /// download starts. On success the package directory holds the payload
    /// and its `metadata.json`; the returned metadata carries the located
    /// bundle path. On failure nothing of the new package remains. Metadata
    /// naming the current package returns the stored copy untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is unusable, the transfer fails, the
    /// archive is malformed or has no entry file, or verification fails.
    pub async fn download_package(
        &self,
        meta: &PackageMetadata,
        entry_file_name: &str,
        progress: &mut ProgressThrottle<'_>,
        public_key: Option<&ReleaseKey>,
    ) -> Result<PackageMetadata, Error> {
        if !meta.has_hash() {
            return Err(Error::invalid_update("package metadata has no packageHash"));
        }
        let url = meta
            .download_url
            .as_deref()
            .ok_or_else(|| NetworkError::MalformedSource {
                url: String::new(),
                message: format!("package {} has no downloadUrl", meta.package_hash),
            })?;
        hotswap_net::validate_source(url)?;

        let hash = meta.package_hash.as_str();
        if self.store.current_package_hash().await?.as_deref() == Some(hash) {
            if let Some(existing) = self.store.get_package(hash).await? {
                tracing::info!(hash, "package is already current; skipping download");
                return Ok(existing);
            }
        }

        let new_dir = self.store.package_path(hash);
        let download_file = self.store.download_file_path();
        let unzipped = self.store.unzipped_path();
        let diff_base = self.store.current_package_path().await?;

        self.store.remove_package_dir(hash).await?;
        fs::create_dir_all(self.store.root()).await?;

        let mut package_guard = CleanupGuard::new(vec![new_dir.clone()]);
        let _transient_guard = CleanupGuard::new(vec![download_file.clone(), unzipped.clone()]);

        let tx = self.tx.as_ref();
        let outcome = download_payload(&self.client, url, &download_file, progress, tx).await?;

        let mut stored = meta.clone();
        let mut is_diff = false;
        let mut signature_verified = false;

        match outcome.payload {
            PayloadKind::Archive => {
                hotswap_store::extract_zip(&download_file, &unzipped).await?;
                fs::remove_path(&download_file).await?;

                if let Some(manifest) = hotswap_store::read_diff_manifest(&unzipped).await? {
                    is_diff = true;
                    tracing::debug!(
                        hash,
                        deleted = manifest.deleted_files.len(),
                        "applying diff package"
                    );
                    match diff_base.as_deref() {
                        Some(base) => {
                            hotswap_store::copy_retained_files(&manifest, base, &new_dir).await?;
                        }
                        None => fs::create_dir_all(&new_dir).await?,
                    }
                }
                hotswap_store::overlay(&unzipped, &new_dir).await?;
                fs::remove_path(&unzipped).await?;

                let bundle = hotswap_store::find_entry_file(&new_dir, entry_file_name)
                    .await?
                    .ok_or_else(|| {
                        Error::invalid_update(format!(
                            "update is invalid - no file named {entry_file_name} found in the package"
                        ))
                    })?;
                fs::remove_path(&new_dir.join(METADATA_FILE_NAME)).await?;

                let verification =
                    verify_package(&new_dir, hash, public_key, is_diff, tx).await?;
                signature_verified = verification.signature_verified;
                stored.relative_bundle_path = Some(bundle);
            }
            PayloadKind::RawBundle => {
                fs::create_dir_all(&new_dir).await?;
                fs::move_file(&download_file, &new_dir.join(entry_file_name)).await?;

                let verification = verify_package(&new_dir, hash, public_key, false, tx).await?;
                signature_verified = verification.signature_verified;
            }
        }

        self.store.write_package_metadata(&stored).await?;
        package_guard.disarm();

        tracing::info!(hash, is_diff, signature_verified, "package downloaded");
        self.emit(AppEvent::Update(UpdateEvent::Downloaded {
            hash: hash.to_string(),
            is_diff,
            verified_signature: signature_verified,
        }));
        Ok(stored)
    }
}
