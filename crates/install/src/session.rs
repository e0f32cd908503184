//! The update session owned by the embedding layer

use crate::downloader::PackageDownloader;
use crate::lifecycle::{self, RestartOutcome};
use hotswap_config::Config;
use hotswap_errors::{Error, UpdateError};
use hotswap_events::{AppEvent, EventEmitter, EventSender, FailureContext, UpdateEvent};
use hotswap_net::{download_to_file, NetClient, NetConfig, ProgressThrottle};
use hotswap_signing::ReleaseKey;
use hotswap_state::RecordStore;
use hotswap_store::PackageStore;
use hotswap_types::{BinaryInfo, DownloadProgress, EntrySource, PackageMetadata, UpdateState};
use std::time::Duration;

/// One process lifetime of the update engine.
///
/// Opening a session runs restart recovery; callers serialize download,
/// install and rollback on a session.
pub struct UpdateSession {
    config: Config,
    binary: BinaryInfo,
    store: PackageStore,
    records: RecordStore,
    client: NetClient,
    public_key: Option<ReleaseKey>,
    tx: Option<EventSender>,
    restart: RestartOutcome,
    did_update: bool,
    need_to_report_rollback: bool,
    is_running_binary_version: bool,
}

impl std::fmt::Debug for UpdateSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateSession")
            .field("root", &self.store.root())
            .field("binary", &self.binary)
            .field("did_update", &self.did_update)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for UpdateSession {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl UpdateSession {
    /// Open the stores under the configured root and recover from the last run
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable, the stores cannot
    /// be opened, or restart recovery fails.
    pub async fn open(
        config: Config,
        binary: BinaryInfo,
        events: Option<EventSender>,
    ) -> Result<Self, Error> {
        let mut binary = binary;
        if let Some(version) = &config.runtime.app_version_override {
            binary.app_version.clone_from(version);
        }

        let root = config.root_dir()?;
        let mut store = PackageStore::new(&root, config.runtime.test_configuration);
        let mut records = RecordStore::open(&config.db_path()?).await?;
        if let Some(tx) = &events {
            store = store.with_event_sender(tx.clone());
            records = records.with_event_sender(tx.clone());
        }

        let client = NetClient::new(NetConfig {
            timeout: Duration::from_secs(config.network.timeout),
            connect_timeout: Duration::from_secs(config.network.connect_timeout),
            user_agent: config.network.user_agent.clone(),
            ..NetConfig::default()
        })?;

        let public_key = match config.public_key().await? {
            Some(raw) => Some(ReleaseKey::parse(&raw)?),
            None => None,
        };

        let restart = lifecycle::initialize_after_restart(
            &store,
            &records,
            &binary,
            config.runtime.test_configuration,
            events.as_ref(),
        )
        .await?;
        tracing::debug!(?restart, "restart initialisation finished");

        let did_update = matches!(restart, RestartOutcome::FirstRun { .. });
        let need_to_report_rollback = matches!(restart, RestartOutcome::RolledBack { .. });

        Ok(Self {
            config,
            binary,
            store,
            records,
            client,
            public_key,
            tx: events,
            restart,
            did_update,
            need_to_report_rollback,
            is_running_binary_version: false,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn binary(&self) -> &BinaryInfo {
        &self.binary
    }

    #[must_use]
    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    #[must_use]
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// What recovery did when this session opened
    #[must_use]
    pub fn restart_outcome(&self) -> &RestartOutcome {
        &self.restart
    }

    /// A progress throttle following the configured notification settings
    pub fn progress_throttle<'a>(
        &self,
        callback: impl FnMut(DownloadProgress) + Send + 'a,
    ) -> ProgressThrottle<'a> {
        if self.config.progress.notify {
            ProgressThrottle::new(self.config.frame_interval(), callback)
        } else {
            ProgressThrottle::disabled()
        }
    }

    /// Download and stage `meta` without installing it.
    ///
    /// Packages refused by verification are added to the failed log.
    ///
    /// # Errors
    ///
    /// Returns the download or verification failure.
    pub async fn download(
        &self,
        meta: &PackageMetadata,
        entry_file_name: &str,
        progress: &mut ProgressThrottle<'_>,
    ) -> Result<PackageMetadata, Error> {
        let mut meta = meta.clone();
        meta.binary_modified_time = Some(self.binary.build_marker.to_string());

        let mut downloader = PackageDownloader::new(self.store.clone(), self.client.clone());
        if let Some(tx) = &self.tx {
            downloader = downloader.with_event_sender(tx.clone());
        }

        match downloader
            .download_package(&meta, entry_file_name, progress, self.public_key.as_ref())
            .await
        {
            Ok(stored) => Ok(stored),
            Err(e) => {
                if e.rejects_package() && meta.has_hash() {
                    tracing::warn!(hash = %meta.package_hash, error = %e, "package rejected");
                    self.records.save_failed_update(&meta).await?;
                    self.emit(AppEvent::Update(UpdateEvent::Rejected {
                        hash: meta.package_hash.clone(),
                        failure: FailureContext::from_error(&e),
                    }));
                }
                Err(e)
            }
        }
    }

    /// Make a downloaded package current and record it as pending
    ///
    /// # Errors
    ///
    /// Returns `InvalidUpdate` for metadata without a hash, or an error if
    /// the stores cannot be updated.
    pub async fn install(&self, meta: &PackageMetadata) -> Result<(), Error> {
        if !meta.has_hash() {
            return Err(Error::invalid_update("cannot install a package without a hash"));
        }

        let discard_current = self.records.is_pending_update(None).await?;
        self.store.install_package(meta, discard_current).await?;
        self.records
            .save_pending_update(&meta.package_hash, false)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the package store cannot be read.
    pub async fn get_current_package(&self) -> Result<Option<PackageMetadata>, Error> {
        self.store.get_current_package().await
    }

    /// # Errors
    ///
    /// Returns an error if the package store cannot be read.
    pub async fn get_previous_package(&self) -> Result<Option<PackageMetadata>, Error> {
        self.store.get_previous_package().await
    }

    /// # Errors
    ///
    /// Returns an error if the package store cannot be read.
    pub async fn get_package(&self, hash: &str) -> Result<Option<PackageMetadata>, Error> {
        self.store.get_package(hash).await
    }

    /// Metadata of the package in the given position
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be read.
    pub async fn get_update_metadata(
        &self,
        state: UpdateState,
    ) -> Result<Option<PackageMetadata>, Error> {
        let Some(current) = self.store.get_current_package().await? else {
            return Ok(None);
        };
        let current_is_pending = self
            .records
            .is_pending_update(Some(&current.package_hash))
            .await?;

        match state {
            UpdateState::Pending if current_is_pending => Ok(Some(current)),
            UpdateState::Pending => Ok(None),
            UpdateState::Running if current_is_pending => self.store.get_previous_package().await,
            UpdateState::Running | UpdateState::Latest => Ok(Some(current)),
        }
    }

    /// Decide which entry file the host should load.
    ///
    /// Packages downloaded by a different binary are stale. They are purged,
    /// except in debug sessions of an unchanged app version, where they stay
    /// on disk while the binary's own entry file is served.
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be read or purged, or the
    /// current package's build marker is corrupt.
    pub async fn resolve_entry_file(&mut self, entry_file_name: &str) -> Result<EntrySource, Error> {
        let Some(current) = self.store.get_current_package().await? else {
            self.is_running_binary_version = true;
            return Ok(EntrySource::Binary);
        };

        let test_configuration = self.config.runtime.test_configuration;
        if !lifecycle::is_package_fresh(&current, &self.binary, test_configuration)? {
            let version_changed = lifecycle::app_version_changed(&current, &self.binary);
            if !self.config.runtime.debug_mode || version_changed {
                tracing::info!(
                    hash = %current.package_hash,
                    version_changed,
                    "purging updates downloaded by another binary"
                );
                self.clear_updates().await?;
                self.emit(AppEvent::Update(UpdateEvent::StalePurged {
                    hash: Some(current.package_hash.clone()),
                }));
            }
            self.is_running_binary_version = true;
            return Ok(EntrySource::Binary);
        }

        match self.store.current_bundle_path(entry_file_name).await? {
            Some(path) if hotswap_store::fs::exists(&path).await => {
                self.is_running_binary_version = false;
                Ok(EntrySource::Package(path))
            }
            _ => {
                tracing::warn!(
                    hash = %current.package_hash,
                    "current package has no entry file; using the binary's"
                );
                self.is_running_binary_version = true;
                Ok(EntrySource::Binary)
            }
        }
    }

    /// Whether the last resolution served the binary's own entry file
    #[must_use]
    pub fn is_running_binary_version(&self) -> bool {
        self.is_running_binary_version
    }

    /// The running package signalled readiness
    ///
    /// # Errors
    ///
    /// Returns an error if the pending record cannot be removed.
    pub async fn confirm_ready(&self) -> Result<(), Error> {
        let hash = self
            .records
            .get_pending_update()
            .await?
            .map(|pending| pending.hash);
        self.records.remove_pending_update().await?;
        self.emit(AppEvent::Update(UpdateEvent::Confirmed { hash }));
        Ok(())
    }

    /// Roll back to the previous package, recording the current one as failed
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be updated.
    pub async fn rollback(&mut self) -> Result<Option<String>, Error> {
        let had_current = self.store.current_package_hash().await?.is_some();
        let restored = lifecycle::rollback(&self.store, &self.records).await?;
        if had_current {
            self.need_to_report_rollback = true;
        }
        Ok(restored)
    }

    /// Remove every package, the pending record and the failed log
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be cleared.
    pub async fn clear_updates(&self) -> Result<(), Error> {
        self.store.clear_updates().await?;
        self.records.remove_pending_update().await?;
        self.records.remove_failed_updates().await?;
        self.emit(AppEvent::Update(UpdateEvent::Cleared));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the record store cannot be read.
    pub async fn is_pending(&self, hash: Option<&str>) -> Result<bool, Error> {
        self.records.is_pending_update(hash).await
    }

    /// # Errors
    ///
    /// Returns an error if the record store cannot be read.
    pub async fn is_failed_hash(&self, hash: &str) -> Result<bool, Error> {
        self.records.is_failed_hash(hash).await
    }

    /// # Errors
    ///
    /// Returns an error if the record store cannot be read.
    pub async fn failed_updates(&self) -> Result<Vec<PackageMetadata>, Error> {
        self.records.get_failed_updates().await
    }

    /// Whether this process is the first run of package `hash`
    ///
    /// # Errors
    ///
    /// Returns an error if the package store cannot be read.
    pub async fn is_first_run(&self, hash: &str) -> Result<bool, Error> {
        if !self.did_update {
            return Ok(false);
        }
        Ok(self.store.current_package_hash().await?.as_deref() == Some(hash))
    }

    #[must_use]
    pub fn did_update(&self) -> bool {
        self.did_update
    }

    #[must_use]
    pub fn need_to_report_rollback(&self) -> bool {
        self.need_to_report_rollback
    }

    pub fn set_need_to_report_rollback(&mut self, value: bool) {
        self.need_to_report_rollback = value;
    }

    /// Overwrite the current package's entry file with the file at `url`.
    ///
    /// Only available in test configurations.
    ///
    /// # Errors
    ///
    /// Returns `NotAllowed` outside test configurations or with nothing
    /// installed, or the download failure.
    pub async fn replace_current_bundle(
        &self,
        url: &str,
        entry_file_name: &str,
    ) -> Result<(), Error> {
        if !self.config.runtime.test_configuration {
            return Err(UpdateError::NotAllowed {
                message: "replacing the current bundle requires a test configuration".to_string(),
            }
            .into());
        }
        let Some(path) = self.store.current_bundle_path(entry_file_name).await? else {
            return Err(UpdateError::NotAllowed {
                message: "no current package to replace".to_string(),
            }
            .into());
        };

        let staging = self.store.download_file_path();
        let received = download_to_file(&self.client, url, &staging).await?;
        hotswap_store::fs::move_file(&staging, &path).await?;
        tracing::info!(path = %path.display(), received, "replaced current bundle");
        Ok(())
    }
}
