use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventMeta, EventSource};
use hotswap_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod download;
pub mod general;
pub mod state;
pub mod update;

pub use download::*;
pub use general::*;
pub use state::*;
pub use update::*;

/// Every event the engine emits, grouped by domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    General(GeneralEvent),
    Download(DownloadEvent),
    Update(UpdateEvent),
    State(StateEvent),
}

impl AppEvent {
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Download(_) => EventSource::Download,
            Self::Update(_) => EventSource::Update,
            Self::State(_) => EventSource::State,
        }
    }

    /// Severity a sink should log this event at
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(
                GeneralEvent::Error { .. }
                | GeneralEvent::OperationFinished {
                    failure: Some(_), ..
                },
            )
            | Self::Download(DownloadEvent::Failed { .. })
            | Self::Update(UpdateEvent::Rejected { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Update(UpdateEvent::RolledBack { .. } | UpdateEvent::StalePurged { .. })
            | Self::State(StateEvent::RecordReset { .. }) => Level::WARN,

            Self::General(GeneralEvent::Debug { .. })
            | Self::Download(DownloadEvent::Progress { .. })
            | Self::State(_) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Package hash this event concerns, if any
    #[must_use]
    pub fn package_hash(&self) -> Option<&str> {
        match self {
            Self::Update(event) => event.package_hash(),
            Self::State(
                StateEvent::PendingRecorded { hash, .. } | StateEvent::FailedRecorded { hash, .. },
            ) => Some(hash),
            _ => None,
        }
    }

    #[must_use]
    pub fn meta(&self) -> EventMeta {
        let meta = EventMeta::new(EventLevel::from(self.log_level()), self.event_source());
        match self.package_hash() {
            Some(hash) => meta.with_correlation_id(hash),
            None => meta,
        }
    }
}
