//! Durable record error types

use std::borrow::Cow;

use crate::{ErrorKind, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("database error: {message}")]
    DatabaseError { message: String },

    #[error("corrupt record {key}: {message}")]
    CorruptRecord { key: String, message: String },

    #[error("migration failed: {message}")]
    MigrationFailed { message: String },
}

impl StateError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            _ => ErrorKind::UnknownIo,
        }
    }
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DatabaseError { .. } => "state.database_error",
            Self::CorruptRecord { .. } => "state.corrupt_record",
            Self::MigrationFailed { .. } => "state.migration_failed",
        };
        Some(code)
    }
}
