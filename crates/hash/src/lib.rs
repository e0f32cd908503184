#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! BLAKE3 content hashing for hotswap
//!
//! A package is identified by the hash of its file manifest. Verification
//! recomputes it over the staged directory before install.

mod file_hasher;
mod package;

pub use file_hasher::{FileHashResult, FileHasher, FileHasherConfig};
pub use package::{compute_package_hash, is_ignored_path, package_manifest};

use hotswap_errors::{Error, StorageError};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// A BLAKE3 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, the form package hashes travel in
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether `expected` names this digest, ignoring hex case
    #[must_use]
    pub fn matches_hex(&self, expected: &str) -> bool {
        hex::decode(expected.trim()).is_ok_and(|bytes| bytes == self.0)
    }

    /// Stream a file through the hasher
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub async fn hash_file(path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, path))?;

        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0; CHUNK_SIZE];
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self(*hasher.finalize().as_bytes()))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
