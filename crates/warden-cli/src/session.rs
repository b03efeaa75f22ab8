//! Opening Warden for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use warden_approle::Issuer;
use warden_core::{Core, WardenConfig};
use warden_policy::CallerContext;
use warden_token::Token;

use crate::cli::{Cli, MountArg};
use crate::error::CliError;

/// Data directory used when neither the flag nor the config names one.
pub const DEFAULT_DATA_DIR: &str = ".warden";

/// Loads the config file if given, then applies the `--data-dir` override.
///
/// # Errors
///
/// Returns [`CliError::Config`] if the file cannot be read or is invalid.
pub fn load_config(config: Option<&Path>, data_dir: Option<&Path>) -> Result<WardenConfig, CliError> {
    let mut loaded = match config {
        Some(path) => WardenConfig::from_file(path).map_err(|e| CliError::Config(e.to_string()))?,
        None => WardenConfig::default(),
    };
    let dir = data_dir
        .map(Path::to_path_buf)
        .or_else(|| loaded.storage.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    loaded = loaded.with_data_dir(dir);
    Ok(loaded)
}

/// An opened core plus the caller's token.
#[derive(Debug)]
pub struct Session {
    core: Arc<Core>,
    token: Option<Token>,
    data_dir: PathBuf,
}

impl Session {
    /// Opens the data directory the CLI arguments point at.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the store cannot be
    /// opened.
    pub fn open(cli: &Cli) -> Result<Self, CliError> {
        let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
        Self::with_config(config, cli.token.clone().map(Token::new))
    }

    /// Opens `config` directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn with_config(config: WardenConfig, token: Option<Token>) -> Result<Self, CliError> {
        let data_dir = config
            .storage
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        debug!(data_dir = %data_dir.display(), "Opening warden");
        let core = Core::open(config)?;
        Ok(Self {
            core: Arc::new(core),
            token,
            data_dir,
        })
    }

    /// Returns the core.
    #[must_use]
    pub const fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the caller token.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::MissingToken`] if none was supplied.
    pub fn token(&self) -> Result<&Token, CliError> {
        self.token.as_ref().ok_or(CliError::MissingToken)
    }

    /// Resolves the caller token.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::MissingToken`] or a permission error.
    pub fn caller(&self) -> Result<CallerContext, CliError> {
        Ok(self.core.caller(self.token()?)?)
    }

    /// Returns the issuer for the selected mount.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the mount is not enabled.
    pub fn issuer(&self, mount: &MountArg) -> Result<Arc<Issuer>, CliError> {
        let name = mount
            .mount
            .as_deref()
            .unwrap_or(&self.core.config().approle.mount);
        Ok(self.core.approle(name)?)
    }
}
