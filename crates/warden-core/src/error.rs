//! Error types for the composition root.

use std::path::PathBuf;

use thiserror::Error;
use warden_store::ErrorKind;

/// Errors that can occur while wiring or driving Warden.
#[derive(Debug, Error)]
pub enum Error {
    /// The named mount does not exist.
    #[error("not found")]
    NotFound,

    /// The caller's token is missing, invalid, or not allowed to do this.
    #[error("permission denied")]
    PermissionDenied,

    /// A mount with this name is already enabled.
    #[error("mount '{mount}' already exists")]
    MountExists {
        /// The mount name.
        mount: String,
    },

    /// The configuration is invalid.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What is wrong.
        reason: String,
    },

    /// The request was malformed.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the request was rejected.
        reason: String,
    },

    /// A key or config file could not be read or written.
    #[error("failed to access '{}': {source}", path.display())]
    File {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Role or secret-id operation failed.
    #[error(transparent)]
    AppRole(#[from] warden_approle::Error),

    /// Token or wrapping operation failed.
    #[error(transparent)]
    Token(#[from] warden_token::Error),

    /// Policy operation failed.
    #[error(transparent)]
    Policy(#[from] warden_policy::Error),

    /// The storage layer failed.
    #[error(transparent)]
    Store(#[from] warden_store::Error),
}

impl Error {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::PermissionDenied => ErrorKind::Unauthorized,
            Self::MountExists { .. } => ErrorKind::Conflict,
            Self::Config { .. } | Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::File { .. } => ErrorKind::Internal,
            Self::AppRole(e) => e.kind(),
            Self::Token(e) => e.kind(),
            Self::Policy(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
