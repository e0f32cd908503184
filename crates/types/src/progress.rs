//! Download progress

use serde::{Deserialize, Serialize};

/// Byte counters of an in-flight download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub total_bytes: u64,
    pub received_bytes: u64,
}

impl DownloadProgress {
    #[must_use]
    pub fn new(total_bytes: u64, received_bytes: u64) -> Self {
        Self {
            total_bytes,
            received_bytes,
        }
    }

    /// The terminating event of a download
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.total_bytes == self.received_bytes
    }
}
