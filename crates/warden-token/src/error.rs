//! Error types for tokens, the cubbyhole and response wrapping.

use thiserror::Error;
use warden_store::ErrorKind;

/// Errors that can occur in token operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The token, accessor or cubbyhole entry is unknown or expired.
    #[error("not found")]
    NotFound,

    /// The single-use token has already been used.
    #[error("token already consumed")]
    AlreadyConsumed,

    /// The request was malformed.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the request was rejected.
        reason: String,
    },

    /// The operation conflicts with the current state of the token.
    #[error("conflict: {reason}")]
    Conflict {
        /// Description of the conflict.
        reason: String,
    },

    /// Sealing or opening a payload failed.
    #[error("encryption error: {reason}")]
    Encryption {
        /// Description of the failure.
        reason: String,
    },

    /// The storage layer failed.
    #[error(transparent)]
    Store(#[from] warden_store::Error),
}

impl Error {
    /// Returns the error category.
    ///
    /// [`Error::AlreadyConsumed`] is reported as [`ErrorKind::NotFound`] so a
    /// consumed token cannot be told apart from an unknown one at the boundary.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound | Self::AlreadyConsumed => ErrorKind::NotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Encryption { .. } => ErrorKind::Internal,
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

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_generic() {
        assert_eq!(Error::NotFound.to_string(), "not found");
        assert_eq!(Error::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(Error::AlreadyConsumed.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn store_errors_keep_their_kind() {
        let err: Error = warden_store::Error::InvalidPath {
            reason: "x".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err: Error = warden_store::Error::Backend {
            reason: "disk".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "storage backend error: disk");
    }

    #[test]
    fn conflict_display() {
        let err = Error::conflict("token is single-use");
        assert_eq!(err.to_string(), "conflict: token is single-use");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
