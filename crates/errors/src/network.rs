//! Network-related error types

use std::borrow::Cow;

use crate::{ErrorKind, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("malformed download source {url}: {message}")]
    MalformedSource { url: String, message: String },

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("received {received} bytes but expected {expected}")]
    DownloadIncomplete { received: u64, expected: u64 },

    #[error("network unavailable")]
    NetworkUnavailable,
}

impl NetworkError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DownloadIncomplete { .. } => ErrorKind::DownloadIncomplete,
            Self::MalformedSource { .. } | Self::UnsupportedProtocol { .. } => {
                ErrorKind::MalformedSource
            }
            _ => ErrorKind::UnknownIo,
        }
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::NetworkUnavailable | Self::ConnectionRefused(_) => {
                Some("Check your network connection and retry.")
            }
            Self::MalformedSource { .. } | Self::UnsupportedProtocol { .. } => {
                Some("The update metadata carries an invalid download URL.")
            }
            Self::DownloadIncomplete { .. } => Some("The connection dropped mid-download; retry."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::DownloadFailed(_)
                | Self::ConnectionRefused(_)
                | Self::NetworkUnavailable
                | Self::DownloadIncomplete { .. }
        ) || matches!(self, Self::HttpError { status, .. } if *status >= 500)
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::DownloadFailed(_) => "network.download_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::MalformedSource { .. } => "network.malformed_source",
            Self::UnsupportedProtocol { .. } => "network.unsupported_protocol",
            Self::HttpError { .. } => "network.http_error",
            Self::DownloadIncomplete { .. } => "network.download_incomplete",
            Self::NetworkUnavailable => "network.unavailable",
        };
        Some(code)
    }
}
