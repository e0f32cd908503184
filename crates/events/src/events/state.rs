use serde::{Deserialize, Serialize};

/// Durable record events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StateEvent {
    /// The pending-update record was written
    PendingRecorded { hash: String, is_loading: bool },

    /// The pending-update record was removed
    PendingCleared,

    /// A failed package was appended to the failed-update log
    FailedRecorded { hash: String, total: usize },

    /// An unreadable record was discarded
    RecordReset { key: String, reason: String },
}
