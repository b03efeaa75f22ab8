//! Auth mount command implementation.

use std::io::Write;

use crate::cli::MountCommands;
use crate::error::CliError;
use crate::output::{Message, NameList, OutputFormat};
use crate::session::Session;

/// Handler for mount subcommands.
pub struct MountCommand<'a> {
    session: &'a Session,
}

impl<'a> MountCommand<'a> {
    /// Creates a new mount command handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Executes the mount subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &MountCommands,
    ) -> Result<(), CliError> {
        match command {
            MountCommands::Enable { name } => {
                let caller = self.session.caller()?;
                let issuer = self.session.core().enable_approle(&caller, name)?;
                format.write(out, &Message::new(format!("Enabled approle at '{}'", issuer.mount())))
            }
            MountCommands::List => format.write(out, &NameList::new("Mounts", self.session.core().mounts())),
        }
    }
}
