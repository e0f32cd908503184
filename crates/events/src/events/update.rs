use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Package lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdateEvent {
    /// A package finished downloading and passed verification
    Downloaded {
        hash: String,
        is_diff: bool,
        verified_signature: bool,
    },

    /// The pointer record now names `hash` as current
    Installed {
        hash: String,
        previous: Option<String>,
        discarded_current: bool,
    },

    /// First run of a freshly installed package
    FirstRun { hash: String },

    /// Readiness signalled; the pending record was cleared
    Confirmed { hash: Option<String> },

    /// A crashed package was rolled back to its predecessor
    RolledBack {
        failed_hash: String,
        restored: Option<String>,
    },

    /// A downloaded package was refused
    Rejected {
        hash: String,
        failure: FailureContext,
    },

    /// Updates became stale against a new binary and were removed
    StalePurged { hash: Option<String> },

    /// Every package and record was removed
    Cleared,
}

impl UpdateEvent {
    #[must_use]
    pub fn package_hash(&self) -> Option<&str> {
        match self {
            Self::Downloaded { hash, .. }
            | Self::Installed { hash, .. }
            | Self::FirstRun { hash }
            | Self::Rejected { hash, .. } => Some(hash),
            Self::RolledBack { failed_hash, .. } => Some(failed_hash),
            Self::Confirmed { hash } | Self::StalePurged { hash } => hash.as_deref(),
            Self::Cleared => None,
        }
    }
}
