//! CLI error handling

use std::fmt;

use hotswap_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(hotswap_errors::Error),
    /// Update engine error
    Update(hotswap_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    fn engine_error(&self) -> Option<&hotswap_errors::Error> {
        match self {
            CliError::Config(e) | CliError::Update(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}")?,
            CliError::Update(e) => write!(f, "{}", e.user_message())?,
            CliError::InvalidArguments(msg) => return write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => return write!(f, "I/O error: {e}"),
        }

        if let Some(e) = self.engine_error() {
            if let Some(code) = e.user_code() {
                write!(f, "\n  Code: {code}")?;
            }
            if let Some(hint) = e.user_hint() {
                write!(f, "\n  Hint: {hint}")?;
            }
            if e.is_retryable() {
                write!(f, "\n  Retry: safe to retry this operation.")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Update(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<hotswap_errors::Error> for CliError {
    fn from(e: hotswap_errors::Error) -> Self {
        match e {
            hotswap_errors::Error::Config(_) => CliError::Config(e),
            other => CliError::Update(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::InvalidArguments(format!("metadata is not valid JSON: {e}"))
    }
}
