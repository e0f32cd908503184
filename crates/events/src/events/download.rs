use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Payload transfer events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    Started {
        url: String,
        total_size: Option<u64>,
    },

    /// Throttled progress update
    Progress {
        url: String,
        received_bytes: u64,
        total_bytes: u64,
    },

    Completed {
        url: String,
        final_size: u64,
    },

    Failed {
        url: String,
        received_bytes: u64,
        failure: FailureContext,
    },
}
