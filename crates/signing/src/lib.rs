#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Release-signature verification for update packages
//!
//! A signed package carries a minisign signature over its package hash in
//! the `.hotswaprelease` file at the package root.

use hotswap_errors::{Error, SigningError, UpdateError};
use hotswap_types::layout::SIGNATURE_FILE_NAME;
use minisign_verify::{PublicKey, Signature};
use std::path::Path;

/// The public key releases are verified against
pub struct ReleaseKey {
    key: PublicKey,
}

impl std::fmt::Debug for ReleaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseKey").finish_non_exhaustive()
    }
}

impl ReleaseKey {
    /// Parse a configured public key.
    ///
    /// Accepts the bare base64 key line or the full text of a minisign
    /// `.pub` file (comment line followed by the key).
    ///
    /// # Errors
    /// Returns [`SigningError::InvalidPublicKey`] for an empty or malformed key.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SigningError::InvalidPublicKey("public key is empty".to_string()).into());
        }

        let key = if trimmed.lines().count() > 1 {
            PublicKey::decode(trimmed)
        } else {
            PublicKey::from_base64(trimmed)
        }
        .map_err(|e| SigningError::InvalidPublicKey(e.to_string()))?;

        Ok(Self { key })
    }
}

/// Read the release token shipped inside a package directory, if any
///
/// # Errors
/// Returns an error if the token exists but cannot be read.
pub async fn read_release_token(package_dir: &Path) -> Result<Option<String>, Error> {
    let path = package_dir.join(SIGNATURE_FILE_NAME);
    match tokio::fs::read_to_string(&path).await {
        Ok(token) => Ok(Some(token)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Verify that `token` is a valid signature by `key` over `expected_hash`
///
/// # Errors
/// Returns [`UpdateError::SignatureVerification`] if the token cannot be
/// parsed or does not verify.
pub fn verify_release_signature(
    token: &str,
    expected_hash: &str,
    key: &ReleaseKey,
) -> Result<(), Error> {
    let rejected = |reason: String| UpdateError::SignatureVerification {
        hash: expected_hash.to_string(),
        reason,
    };

    let signature =
        Signature::decode(token.trim()).map_err(|e| rejected(format!("invalid token: {e}")))?;

    key.key
        .verify(expected_hash.as_bytes(), &signature, false)
        .map_err(|e| rejected(e.to_string()))?;

    tracing::debug!(hash = expected_hash, "release signature verified");
    Ok(())
}
