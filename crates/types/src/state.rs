//! Persisted install records and the install state machine's states

use serde::{Deserialize, Serialize};

/// Contents of `status.json`: which packages are running and retained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerRecord {
    #[serde(default)]
    pub current_package: Option<String>,
    #[serde(default)]
    pub previous_package: Option<String>,
}

/// The single pending-update record in the durable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    pub hash: String,
    pub is_loading: bool,
}

/// Where an installed update stands between install and confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    NoPendingUpdate,
    /// Installed, not yet run
    PendingConfirmed { hash: String },
    /// First run started, readiness not yet signalled
    PendingArmed { hash: String },
}

impl InstallState {
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::NoPendingUpdate => None,
            Self::PendingConfirmed { hash } | Self::PendingArmed { hash } => Some(hash),
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::PendingArmed { .. })
    }
}

impl From<Option<PendingUpdate>> for InstallState {
    fn from(pending: Option<PendingUpdate>) -> Self {
        match pending {
            None => Self::NoPendingUpdate,
            Some(PendingUpdate {
                hash,
                is_loading: true,
            }) => Self::PendingArmed { hash },
            Some(PendingUpdate {
                hash,
                is_loading: false,
            }) => Self::PendingConfirmed { hash },
        }
    }
}

impl From<&InstallState> for Option<PendingUpdate> {
    fn from(state: &InstallState) -> Self {
        match state {
            InstallState::NoPendingUpdate => None,
            InstallState::PendingConfirmed { hash } => Some(PendingUpdate {
                hash: hash.clone(),
                is_loading: false,
            }),
            InstallState::PendingArmed { hash } => Some(PendingUpdate {
                hash: hash.clone(),
                is_loading: true,
            }),
        }
    }
}

/// Which package a metadata query refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateState {
    /// The package the process is executing right now
    Running,
    /// An installed package awaiting its first run
    Pending,
    /// The most recently installed package
    Latest,
}
