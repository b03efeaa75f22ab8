//! CLI error types.

use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A Warden operation failed.
    #[error(transparent)]
    Warden(#[from] warden_core::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `init` was run against a data directory that already holds a key.
    #[error("'{}' is already initialized", .0.display())]
    AlreadyInitialized(std::path::PathBuf),

    /// No caller token was supplied.
    #[error("no token supplied; pass --token or set WARDEN_TOKEN")]
    MissingToken,

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<warden_approle::Error> for CliError {
    fn from(err: warden_approle::Error) -> Self {
        Self::Warden(err.into())
    }
}

impl From<warden_policy::Error> for CliError {
    fn from(err: warden_policy::Error) -> Self {
        Self::Warden(err.into())
    }
}
