//! Pending-update lifecycle across process restarts
//!
//! An installed package is recorded as pending. The first process start
//! after install arms the record; a second start that still finds it armed
//! means the package crashed before signalling readiness, and it is rolled
//! back.

use hotswap_errors::Error;
use hotswap_events::{AppEvent, EventEmitter, EventSender, UpdateEvent};
use hotswap_state::RecordStore;
use hotswap_store::PackageStore;
use hotswap_types::{BinaryInfo, InstallState, PackageMetadata};

/// What restart initialisation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    NoPendingUpdate,
    /// A newer binary replaced the app; the pending record is left alone
    Superseded,
    /// The pending record named a package that is no longer current
    StaleRecordCleared { hash: String },
    RolledBack {
        failed_hash: String,
        restored: Option<String>,
    },
    FirstRun { hash: String },
}

/// Whether `meta` was downloaded by the running binary.
///
/// The recorded build marker must match exactly, and unless running a test
/// configuration so must the app version.
///
/// # Errors
///
/// Returns a corrupt-record error if the recorded build marker is not a number.
pub fn is_package_fresh(
    meta: &PackageMetadata,
    binary: &BinaryInfo,
    test_configuration: bool,
) -> Result<bool, Error> {
    let marker_matches = meta.binary_build_marker()? == Some(binary.build_marker);
    Ok(marker_matches && (test_configuration || !app_version_changed(meta, binary)))
}

#[must_use]
pub fn app_version_changed(meta: &PackageMetadata, binary: &BinaryInfo) -> bool {
    meta.app_version.as_deref() != Some(binary.app_version.as_str())
}

/// Record the current package as failed and fall back to the previous one
///
/// # Errors
///
/// Returns an error if a record or the package store cannot be updated.
pub async fn rollback(store: &PackageStore, records: &RecordStore) -> Result<Option<String>, Error> {
    match store.get_current_package().await? {
        Some(failed) => records.save_failed_update(&failed).await?,
        None => tracing::warn!("rolling back without metadata for the current package"),
    }
    let restored = store.rollback_package().await?;
    records.remove_pending_update().await?;
    Ok(restored)
}

/// Advance the pending-update record after a process start
///
/// # Errors
///
/// Returns an error if a record or the package store cannot be read or
/// updated.
pub async fn initialize_after_restart(
    store: &PackageStore,
    records: &RecordStore,
    binary: &BinaryInfo,
    test_configuration: bool,
    tx: Option<&EventSender>,
) -> Result<RestartOutcome, Error> {
    let state = records.install_state().await?;
    let Some(pending_hash) = state.hash().map(str::to_string) else {
        return Ok(RestartOutcome::NoPendingUpdate);
    };

    let Some(current) = store.get_current_package().await? else {
        tracing::info!(hash = %pending_hash, "no current package; skipping restart checks");
        return Ok(RestartOutcome::Superseded);
    };
    if !is_package_fresh(&current, binary, test_configuration)?
        && app_version_changed(&current, binary)
    {
        tracing::info!(
            hash = %pending_hash,
            app_version = %binary.app_version,
            "binary superseded the pending update"
        );
        return Ok(RestartOutcome::Superseded);
    }

    if current.package_hash != pending_hash {
        tracing::warn!(
            pending = %pending_hash,
            current = %current.package_hash,
            "pending record does not name the current package; clearing it"
        );
        if let Some(tx) = tx {
            tx.emit_warning_with_context(
                "cleared stale pending update record",
                format!("pending {pending_hash}, current {}", current.package_hash),
            );
        }
        records.remove_pending_update().await?;
        return Ok(RestartOutcome::StaleRecordCleared { hash: pending_hash });
    }

    match state {
        InstallState::PendingArmed { hash } => {
            tracing::warn!(%hash, "update did not signal readiness; rolling back");
            let restored = rollback(store, records).await?;
            Ok(RestartOutcome::RolledBack {
                failed_hash: hash,
                restored,
            })
        }
        InstallState::PendingConfirmed { hash } => {
            records.save_pending_update(&hash, true).await?;
            tracing::info!(%hash, "first run of installed update");
            if let Some(tx) = tx {
                tx.emit(AppEvent::Update(UpdateEvent::FirstRun { hash: hash.clone() }));
            }
            Ok(RestartOutcome::FirstRun { hash })
        }
        InstallState::NoPendingUpdate => Ok(RestartOutcome::NoPendingUpdate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(marker: &str, version: &str) -> PackageMetadata {
        let mut meta = PackageMetadata::new("h").with_app_version(version);
        meta.binary_modified_time = Some(marker.to_string());
        meta
    }

    #[test]
    fn test_freshness_requires_marker_and_version() {
        let binary = BinaryInfo::new(100, "1.0");
        assert!(is_package_fresh(&stamped("100", "1.0"), &binary, false).unwrap());
        assert!(!is_package_fresh(&stamped("99", "1.0"), &binary, false).unwrap());
        assert!(!is_package_fresh(&stamped("100", "1.1"), &binary, false).unwrap());
        assert!(is_package_fresh(&stamped("100", "1.1"), &binary, true).unwrap());
        assert!(!is_package_fresh(&PackageMetadata::new("h"), &binary, true).unwrap());
    }

    #[test]
    fn test_corrupt_marker_is_error() {
        let binary = BinaryInfo::new(100, "1.0");
        let err = is_package_fresh(&stamped("soon", "1.0"), &binary, false).unwrap_err();
        assert_eq!(err.kind(), hotswap_errors::ErrorKind::CorruptRecord);
    }
}
