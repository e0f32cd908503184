//! Signing error types

use std::borrow::Cow;

use crate::{ErrorKind, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("signature verification failed: {reason}")]
    VerificationFailed { reason: String },

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("invalid public key format: {0}")]
    InvalidPublicKey(String),
}

impl SigningError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VerificationFailed { .. } | Self::InvalidSignatureFormat(_) => {
                ErrorKind::SignatureVerification
            }
            Self::InvalidPublicKey(_) => ErrorKind::InvalidUpdate,
        }
    }
}

impl UserFacingError for SigningError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPublicKey(_) => {
                Some("Set `security.public_key` to a minisign public key in base64 form.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::VerificationFailed { .. } => "signing.verification_failed",
            Self::InvalidSignatureFormat(_) => "signing.invalid_signature_format",
            Self::InvalidPublicKey(_) => "signing.invalid_public_key",
        };
        Some(code)
    }
}
