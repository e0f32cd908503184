#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Update installation for hotswap
//!
//! This crate ties the package store, the record store and the download
//! pipeline together: it stages verified packages, moves them through the
//! pending-update lifecycle and rolls back packages that never signal
//! readiness.

mod downloader;
mod lifecycle;
mod session;
mod verification;

pub use downloader::PackageDownloader;
pub use lifecycle::{
    app_version_changed, initialize_after_restart, is_package_fresh, rollback, RestartOutcome,
};
pub use session::UpdateSession;
pub use verification::{verify_package, Verification};
