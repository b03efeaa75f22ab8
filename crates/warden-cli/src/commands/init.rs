//! `warden init`.

use std::io::Write;

use tracing::info;
use warden_core::{WardenConfig, KEY_FILE};

use crate::error::CliError;
use crate::output::{InitOutput, OutputFormat};
use crate::session::Session;

/// Handler for `init`.
pub struct InitCommand {
    config: WardenConfig,
}

impl InitCommand {
    /// Creates a handler that initializes the data directory in `config`.
    #[must_use]
    pub const fn new(config: WardenConfig) -> Self {
        Self { config }
    }

    /// Creates the store, salt and barrier key, enables the configured mount,
    /// and prints a root token.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::AlreadyInitialized`] if a barrier key exists, or
    /// an error if the directory cannot be written.
    pub fn execute<W: Write>(self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        if let Some(dir) = &self.config.storage.data_dir {
            if dir.join(KEY_FILE).exists() {
                return Err(CliError::AlreadyInitialized(dir.clone()));
            }
        }

        let session = Session::with_config(self.config, None)?;
        let root = session.core().create_root_token()?;
        info!(data_dir = %session.data_dir().display(), "Initialized warden");

        let output = InitOutput {
            data_dir: session.data_dir().to_path_buf(),
            mounts: session.core().mounts(),
            accessor: root.metadata.accessor.clone(),
            root_token: root.token,
        };
        format.write(out, &output)
    }
}
