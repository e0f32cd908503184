#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for hotswap
//!
//! This crate downloads update payloads over HTTP(S) or from local files,
//! streaming them to disk with throttled progress reporting.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{
    download_payload, download_to_file, DownloadOutcome, ProgressThrottle, DEFAULT_FRAME_INTERVAL,
};

use hotswap_errors::Error;

/// Check that `url` is a usable download source without touching the network
///
/// # Errors
///
/// Returns `MalformedSource` if the URL cannot be parsed or uses a scheme
/// other than http, https or file.
pub fn validate_source(url: &str) -> Result<(), Error> {
    download::validate_url(url).map(|_| ())
}
