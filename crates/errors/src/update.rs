//! Update package validation error types

use std::borrow::Cow;

use crate::{ErrorKind, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum UpdateError {
    #[error("invalid update: {message}")]
    InvalidUpdate { message: String },

    #[error("package hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("update package {hash} failed signature verification: {reason}")]
    SignatureVerification { hash: String, reason: String },

    #[error("update not allowed: {message}")]
    NotAllowed { message: String },
}

impl UpdateError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUpdate { .. } | Self::NotAllowed { .. } => ErrorKind::InvalidUpdate,
            Self::HashMismatch { .. } => ErrorKind::HashMismatch,
            Self::SignatureVerification { .. } => ErrorKind::SignatureVerification,
        }
    }
}

impl UserFacingError for UpdateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::HashMismatch { .. } | Self::SignatureVerification { .. } => {
                Some("The package was rejected; publish a new release rather than retrying.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidUpdate { .. } => "update.invalid",
            Self::HashMismatch { .. } => "update.hash_mismatch",
            Self::SignatureVerification { .. } => "update.signature_verification",
            Self::NotAllowed { .. } => "update.not_allowed",
        };
        Some(code)
    }
}
