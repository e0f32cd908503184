//! Typed access to the pending-update record and the failed-update log

use crate::queries;
use hotswap_errors::Error;
use hotswap_events::{AppEvent, EventEmitter, EventSender, StateEvent};
use hotswap_types::{InstallState, PackageMetadata, PendingUpdate};
use sqlx::{Pool, Sqlite};
use std::path::Path;

pub const PENDING_UPDATE_KEY: &str = "pendingUpdate";
pub const FAILED_UPDATES_KEY: &str = "failedUpdates";

/// Durable record store backed by `SQLite`
#[derive(Clone)]
pub struct RecordStore {
    pool: Pool<Sqlite>,
    tx: Option<EventSender>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl EventEmitter for RecordStore {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl RecordStore {
    /// Open (creating if needed) the database at `db_path` and migrate it
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created, opened or migrated.
    pub async fn open(db_path: &Path) -> Result<Self, Error> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let pool = crate::create_pool(db_path).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::from_pool(pool))
    }

    #[must_use]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool, tx: None }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, Error> {
        queries::get_value(&self.pool, key).await
    }

    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn set_value(&self, key: &str, value: &str) -> Result<(), Error> {
        queries::set_value(&self.pool, key, value).await
    }

    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn remove_value(&self, key: &str) -> Result<(), Error> {
        queries::remove_value(&self.pool, key).await
    }

    /// The pending-update record; an unreadable record reads as absent
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_pending_update(&self) -> Result<Option<PendingUpdate>, Error> {
        let Some(raw) = self.get_value(PENDING_UPDATE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<PendingUpdate>(&raw) {
            Ok(pending) => Ok(Some(pending)),
            Err(e) => {
                tracing::warn!(error = %e, "unable to parse pending update record");
                self.emit(AppEvent::State(StateEvent::RecordReset {
                    key: PENDING_UPDATE_KEY.to_string(),
                    reason: e.to_string(),
                }));
                Ok(None)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn save_pending_update(&self, hash: &str, is_loading: bool) -> Result<(), Error> {
        let pending = PendingUpdate {
            hash: hash.to_string(),
            is_loading,
        };
        let encoded = serde_json::to_string(&pending)?;
        self.set_value(PENDING_UPDATE_KEY, &encoded).await?;

        tracing::debug!(hash, is_loading, "saved pending update");
        self.emit(AppEvent::State(StateEvent::PendingRecorded {
            hash: pending.hash,
            is_loading,
        }));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn remove_pending_update(&self) -> Result<(), Error> {
        self.remove_value(PENDING_UPDATE_KEY).await?;
        self.emit(AppEvent::State(StateEvent::PendingCleared));
        Ok(())
    }

    /// The pending record viewed as an install state
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn install_state(&self) -> Result<InstallState, Error> {
        Ok(InstallState::from(self.get_pending_update().await?))
    }

    /// Whether an installed update is waiting for its first run.
    ///
    /// True only while the record exists and is not loading; with `hash`
    /// given, the record must also name that package.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn is_pending_update(&self, hash: Option<&str>) -> Result<bool, Error> {
        Ok(match self.get_pending_update().await? {
            Some(pending) => !pending.is_loading && hash.is_none_or(|h| h == pending.hash),
            None => false,
        })
    }

    /// Failed-update log in insertion order.
    ///
    /// An unreadable log is replaced by an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query or reset write fails.
    pub async fn get_failed_updates(&self) -> Result<Vec<PackageMetadata>, Error> {
        let Some(raw) = self.get_value(FAILED_UPDATES_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<PackageMetadata>>(&raw) {
            Ok(failed) => Ok(failed),
            Err(e) => {
                tracing::warn!(error = %e, "unable to parse failed updates, resetting");
                self.set_value(FAILED_UPDATES_KEY, "[]").await?;
                self.emit(AppEvent::State(StateEvent::RecordReset {
                    key: FAILED_UPDATES_KEY.to_string(),
                    reason: e.to_string(),
                }));
                Ok(Vec::new())
            }
        }
    }

    /// Append a package to the failed-update log
    ///
    /// # Errors
    ///
    /// Returns an error if the database query or write fails.
    pub async fn save_failed_update(&self, package: &PackageMetadata) -> Result<(), Error> {
        let mut failed = self.get_failed_updates().await?;
        failed.push(package.clone());
        let encoded = serde_json::to_string(&failed)?;
        self.set_value(FAILED_UPDATES_KEY, &encoded).await?;

        self.emit(AppEvent::State(StateEvent::FailedRecorded {
            hash: package.package_hash.clone(),
            total: failed.len(),
        }));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn remove_failed_updates(&self) -> Result<(), Error> {
        self.remove_value(FAILED_UPDATES_KEY).await
    }

    /// Whether `hash` was ever recorded as failed
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn is_failed_hash(&self, hash: &str) -> Result<bool, Error> {
        Ok(self
            .get_failed_updates()
            .await?
            .iter()
            .any(|p| p.package_hash == hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, RecordStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open(&temp_dir.path().join("records.sqlite"))
            .await
            .unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_is_pending_update_requires_not_loading() {
        let (_dir, store) = open_store().await;
        assert!(!store.is_pending_update(None).await.unwrap());

        store.save_pending_update("v2", false).await.unwrap();
        assert!(store.is_pending_update(None).await.unwrap());
        assert!(store.is_pending_update(Some("v2")).await.unwrap());
        assert!(!store.is_pending_update(Some("v3")).await.unwrap());

        store.save_pending_update("v2", true).await.unwrap();
        assert!(!store.is_pending_update(None).await.unwrap());
        assert_eq!(
            store.install_state().await.unwrap(),
            InstallState::PendingArmed { hash: "v2".into() }
        );
    }

    #[tokio::test]
    async fn test_corrupt_pending_reads_as_absent() {
        let (_dir, store) = open_store().await;
        store
            .set_value(PENDING_UPDATE_KEY, "{not json")
            .await
            .unwrap();
        assert!(store.get_pending_update().await.unwrap().is_none());
        assert_eq!(
            store.install_state().await.unwrap(),
            InstallState::NoPendingUpdate
        );
    }

    #[tokio::test]
    async fn test_corrupt_failed_log_is_reset() {
        let (_dir, store) = open_store().await;
        store.set_value(FAILED_UPDATES_KEY, "oops").await.unwrap();
        assert!(store.get_failed_updates().await.unwrap().is_empty());
        assert_eq!(
            store.get_value(FAILED_UPDATES_KEY).await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (_dir, store) = open_store().await;
        let (tx, mut rx) = hotswap_events::channel();
        let store = store.with_event_sender(tx);

        store.save_pending_update("v1", false).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            AppEvent::State(StateEvent::PendingRecorded { ref hash, is_loading: false }) if hash == "v1"
        ));
    }
}
