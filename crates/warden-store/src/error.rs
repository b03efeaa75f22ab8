//! Error types for the storage boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The coarse error categories every Warden component reports.
///
/// Component errors carry richer detail internally, but callers at the
/// transport boundary only ever see one of these kinds. `NotFound` deliberately
/// covers "unknown", "expired" and "already consumed" alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The referenced object is unknown, expired, or consumed.
    NotFound,
    /// A policy denied the action.
    Unauthorized,
    /// The request was malformed.
    InvalidArgument,
    /// The request conflicts with the current state of the object.
    Conflict,
    /// Storage or another internal failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum Error {
    /// The path is malformed.
    #[error("invalid path: {reason}")]
    InvalidPath {
        /// Why the path was rejected.
        reason: String,
    },

    /// The backend failed to complete the operation.
    #[error("storage backend error: {reason}")]
    Backend {
        /// Description of the failure.
        reason: String,
    },

    /// Encoding or decoding a stored value failed.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// Filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } => ErrorKind::InvalidArgument,
            Self::Backend { .. } | Self::Serialization { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
