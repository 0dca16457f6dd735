//! Error types for the NoteSense client.

use thiserror::Error;

/// Result type alias using NoteSense's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for NoteSense client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Server answered with a non-2xx status (other than 401)
    #[error("Transport error ({status}): {message}")]
    Transport { status: u16, message: String },

    /// Server answered 401, or no credential is bound to the session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP/network request failed before a response arrived
    #[error("Request error: {0}")]
    Request(String),

    /// Response body did not match the documented schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found in the local store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classes the UI layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network unreachable, timeouts, non-2xx statuses. Logged and surfaced
    /// as a generic failure.
    Transport,
    /// 401. Forces the session to be cleared.
    Authorization,
    /// Unexpected shapes and bad input. Reads fall back to empty results.
    Validation,
}

impl Error {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Unauthorized(_) => ErrorCategory::Authorization,
            Error::Transport { .. } | Error::Request(_) | Error::Io(_) => {
                ErrorCategory::Transport
            }
            Error::InvalidResponse(_)
            | Error::Serialization(_)
            | Error::NotFound(_)
            | Error::InvalidInput(_)
            | Error::Config(_) => ErrorCategory::Validation,
        }
    }

    /// HTTP status carried by the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => Some(*status),
            Error::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::InvalidResponse(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}
