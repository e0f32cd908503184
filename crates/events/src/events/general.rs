use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Diagnostics that belong to no particular domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    Warning {
        message: String,
        context: Option<String>,
    },

    Error {
        message: String,
    },

    Debug {
        message: String,
    },

    /// A session operation began
    OperationStarted { operation: String },

    /// A session operation ended; `failure` is set when it did not succeed
    OperationFinished {
        operation: String,
        failure: Option<FailureContext>,
    },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>, context: Option<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context,
        }
    }
}
