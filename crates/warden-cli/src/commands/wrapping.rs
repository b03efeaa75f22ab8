//! Unwrap and wrapping-token commands.
//!
//! None of these need a caller token: the wrapping token is the credential.

use std::io::Write;

use warden_token::Token;

use crate::cli::WrappingCommands;
use crate::error::CliError;
use crate::output::OutputFormat;
use crate::session::Session;

/// Handler for `unwrap` and wrapping subcommands.
pub struct WrappingCommand<'a> {
    session: &'a Session,
}

impl<'a> WrappingCommand<'a> {
    /// Creates a new wrapping command handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Unwraps `wrapping_token` and prints the original response.
    ///
    /// # Errors
    ///
    /// Returns a not-found error unless this is the token's first unwrap.
    pub fn unwrap<W: Write>(&self, out: &mut W, format: &OutputFormat, wrapping_token: &str) -> Result<(), CliError> {
        let payload = self.session.core().unwrap(&Token::new(wrapping_token))?;
        format.write(out, &payload)
    }

    /// Executes the wrapping subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &WrappingCommands,
    ) -> Result<(), CliError> {
        let core = self.session.core();
        match command {
            WrappingCommands::Lookup { wrapping_token } => {
                format.write(out, &core.lookup_wrapping(&Token::new(wrapping_token.as_str()))?)
            }
            WrappingCommands::Rewrap { wrapping_token } => {
                format.write(out, &core.rewrap(&Token::new(wrapping_token.as_str()))?)
            }
        }
    }
}
