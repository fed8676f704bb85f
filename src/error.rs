//! Centralized error types for mmskit.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::message::MessageId;

/// All errors produced by the mmskit library.
#[derive(Error, Debug)]
pub enum MessagesError {
    /// A required input is missing or malformed, or the operation does not
    /// apply to this kind of message.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A structured value could not be allocated.
    #[error("Out of memory while building {0}")]
    OutOfMemory(&'static str),

    /// The message store rejected or failed an operation.
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No message (or no MMS body) is stored under this id.
    #[error("Message {0} not found")]
    NotFound(MessageId),

    /// A stored record is corrupt or was written by an incompatible version.
    #[error("Corrupt or incompatible record '{path}': {reason}")]
    InvalidRecord { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, MessagesError>`.
pub type Result<T> = std::result::Result<T, MessagesError>;

impl MessagesError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for an `InvalidParameter` with a formatted reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `MessagesError::io`).
impl From<std::io::Error> for MessagesError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
