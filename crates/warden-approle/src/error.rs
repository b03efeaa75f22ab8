//! Error types for role and secret-id operations.

use thiserror::Error;
use warden_store::ErrorKind;

/// Errors that can occur in role and secret-id operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The role, secret-id or accessor does not exist.
    #[error("not found")]
    NotFound,

    /// Login failed. Every login failure maps here regardless of cause.
    #[error("invalid role or secret id")]
    InvalidCredentials,

    /// The request was malformed.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the request was rejected.
        reason: String,
    },

    /// The request conflicts with existing state.
    #[error("conflict: {reason}")]
    Conflict {
        /// Description of the conflict.
        reason: String,
    },

    /// Policy evaluation failed or denied the action.
    #[error(transparent)]
    Policy(#[from] warden_policy::Error),

    /// Token or wrapping failed.
    #[error(transparent)]
    Token(#[from] warden_token::Error),

    /// The storage layer failed.
    #[error(transparent)]
    Store(#[from] warden_store::Error),
}

impl Error {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound | Self::InvalidCredentials => ErrorKind::NotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Policy(e) => e.kind(),
            Self::Token(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}

/// Result type alias for role and secret-id operations.
pub type Result<T> = std::result::Result<T, Error>;
