//! Error types for policies.

use thiserror::Error;
use warden_store::ErrorKind;

/// Errors that can occur in policy operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A role, mount or policy name is malformed.
    #[error("invalid name: {reason}")]
    InvalidName {
        /// Why the name was rejected.
        reason: String,
    },

    /// A role or mount pattern is malformed.
    #[error("invalid pattern: {reason}")]
    InvalidPattern {
        /// Why the pattern was rejected.
        reason: String,
    },

    /// An action name is not recognised.
    #[error("unknown action: {name}")]
    UnknownAction {
        /// The unrecognised name.
        name: String,
    },

    /// The policy document is malformed.
    #[error("invalid policy: {reason}")]
    InvalidPolicy {
        /// Why the policy was rejected.
        reason: String,
    },

    /// The policy name is reserved.
    #[error("policy '{name}' is reserved")]
    Reserved {
        /// The reserved name.
        name: String,
    },

    /// The policy does not exist.
    #[error("not found")]
    NotFound,

    /// No attached policy allows the action.
    #[error("permission denied")]
    PermissionDenied,

    /// The storage layer failed.
    #[error(transparent)]
    Store(#[from] warden_store::Error),
}

impl Error {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. }
            | Self::InvalidPattern { .. }
            | Self::UnknownAction { .. }
            | Self::InvalidPolicy { .. }
            | Self::Reserved { .. } => ErrorKind::InvalidArgument,
            Self::NotFound => ErrorKind::NotFound,
            Self::PermissionDenied => ErrorKind::Unauthorized,
            Self::Store(e) => e.kind(),
        }
    }
}

/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, Error>;
