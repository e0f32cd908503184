//! Structured logging integration for events
//!
//! Converts domain events drained from the session's channel into tracing
//! records with structured fields.

use hotswap_events::{AppEvent, DownloadEvent, GeneralEvent, StateEvent, UpdateEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let meta = event.meta();

    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    context = ?context,
                    "{message}"
                );
            }
            GeneralEvent::Error { message } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    "{message}"
                );
            }
            GeneralEvent::Debug { message } => {
                debug!(source = meta.source.as_str(), "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    "Operation started"
                );
            }
            GeneralEvent::OperationFinished {
                operation,
                failure: None,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    "Operation completed"
                );
            }
            GeneralEvent::OperationFinished {
                operation,
                failure: Some(failure),
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    "Operation failed: {}",
                    failure.message
                );
            }
        },

        AppEvent::Download(download) => match download {
            DownloadEvent::Started { url, total_size } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    url = %url,
                    total_size = ?total_size,
                    "Download started"
                );
            }
            DownloadEvent::Progress {
                url,
                received_bytes,
                total_bytes,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    url = %url,
                    received_bytes = received_bytes,
                    total_bytes = total_bytes,
                    "Download progress"
                );
            }
            DownloadEvent::Completed { url, final_size } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    url = %url,
                    final_size = final_size,
                    "Download completed"
                );
            }
            DownloadEvent::Failed {
                url,
                received_bytes,
                failure,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    url = %url,
                    received_bytes = received_bytes,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    "Download failed: {}",
                    failure.message
                );
            }
        },

        AppEvent::Update(update) => log_update_event(update, &meta),

        AppEvent::State(state) => match state {
            StateEvent::PendingRecorded { hash, is_loading } => {
                debug!(
                    source = meta.source.as_str(),
                    hash = %hash,
                    is_loading = is_loading,
                    "Pending record saved"
                );
            }
            StateEvent::PendingCleared => {
                debug!(source = meta.source.as_str(), "Pending record cleared");
            }
            StateEvent::FailedRecorded { hash, total } => {
                debug!(
                    source = meta.source.as_str(),
                    hash = %hash,
                    total = total,
                    "Failed update recorded"
                );
            }
            StateEvent::RecordReset { key, reason } => {
                warn!(
                    source = meta.source.as_str(),
                    key = %key,
                    reason = %reason,
                    "Unreadable record reset"
                );
            }
        },
    }
}

fn log_update_event(event: &UpdateEvent, meta: &hotswap_events::EventMeta) {
    let correlation = meta.correlation_id.as_deref();
    match event {
        UpdateEvent::Downloaded {
            hash,
            is_diff,
            verified_signature,
        } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?correlation,
                hash = %hash,
                is_diff = is_diff,
                verified_signature = verified_signature,
                "Package downloaded"
            );
        }
        UpdateEvent::Installed {
            hash,
            previous,
            discarded_current,
        } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?correlation,
                hash = %hash,
                previous = ?previous,
                discarded_current = discarded_current,
                "Package installed"
            );
        }
        UpdateEvent::FirstRun { hash } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                hash = %hash,
                "First run of installed package"
            );
        }
        UpdateEvent::Confirmed { hash } => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                hash = ?hash,
                "Package confirmed ready"
            );
        }
        UpdateEvent::RolledBack {
            failed_hash,
            restored,
        } => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?correlation,
                failed_hash = %failed_hash,
                restored = ?restored,
                "Package rolled back"
            );
        }
        UpdateEvent::Rejected { hash, failure } => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?correlation,
                hash = %hash,
                code = ?failure.code,
                hint = ?failure.hint,
                "Package rejected: {}",
                failure.message
            );
        }
        UpdateEvent::StalePurged { hash } => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                hash = ?hash,
                "Stale updates purged"
            );
        }
        UpdateEvent::Cleared => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                "Updates cleared"
            );
        }
    }
}
