//! Integrity checks run before a downloaded package may be installed

use hotswap_errors::{Error, UpdateError};
use hotswap_events::{EventEmitter, EventSender};
use hotswap_hash::compute_package_hash;
use hotswap_signing::{read_release_token, verify_release_signature, ReleaseKey};
use std::path::Path;

/// What was checked for an accepted package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verification {
    pub hash_checked: bool,
    pub signature_verified: bool,
}

/// Check a staged package directory against its expected hash.
///
/// | release token | key configured | checks                    |
/// |---------------|----------------|---------------------------|
/// | yes           | yes            | hash, then signature      |
/// | yes           | no             | hash (with a warning)     |
/// | no            | yes            | rejected                  |
/// | no            | no             | hash, for diff packages   |
///
/// # Errors
///
/// Returns `HashMismatch`, `SignatureVerification` or `InvalidUpdate` when a
/// check fails, or an I/O error if the package cannot be read.
pub async fn verify_package(
    package_dir: &Path,
    expected_hash: &str,
    public_key: Option<&ReleaseKey>,
    is_diff: bool,
    tx: Option<&EventSender>,
) -> Result<Verification, Error> {
    let token = read_release_token(package_dir).await?;

    match (token, public_key) {
        (Some(token), Some(key)) => {
            verify_hash(package_dir, expected_hash).await?;
            verify_release_signature(&token, expected_hash, key)?;
            Ok(Verification {
                hash_checked: true,
                signature_verified: true,
            })
        }
        (Some(_), None) => {
            tracing::warn!(
                hash = expected_hash,
                "package is signed but no public key is configured; checking hash only"
            );
            if let Some(tx) = tx {
                tx.emit_warning_with_context(
                    "signed package accepted without signature check",
                    "no public key configured",
                );
            }
            verify_hash(package_dir, expected_hash).await?;
            Ok(Verification {
                hash_checked: true,
                signature_verified: false,
            })
        }
        (None, Some(_)) => Err(Error::invalid_update(format!(
            "package {expected_hash} is not signed but a public key is configured"
        ))),
        (None, None) if is_diff => {
            verify_hash(package_dir, expected_hash).await?;
            Ok(Verification {
                hash_checked: true,
                signature_verified: false,
            })
        }
        (None, None) => Ok(Verification::default()),
    }
}

async fn verify_hash(package_dir: &Path, expected_hash: &str) -> Result<(), Error> {
    let actual = compute_package_hash(package_dir).await?;
    if !actual.matches_hex(expected_hash) {
        return Err(UpdateError::HashMismatch {
            expected: expected_hash.to_string(),
            actual: actual.to_hex(),
        }
        .into());
    }
    tracing::debug!(hash = expected_hash, "package hash verified");
    Ok(())
}
