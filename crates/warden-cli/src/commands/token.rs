//! Token command implementation.

use std::io::Write;
use std::time::Duration;

use warden_token::TokenRequest;

use crate::cli::TokenCommands;
use crate::error::CliError;
use crate::output::{Message, OutputFormat, TokenOutput};
use crate::session::Session;

/// Handler for token subcommands.
pub struct TokenCommand<'a> {
    session: &'a Session,
}

impl<'a> TokenCommand<'a> {
    /// Creates a new token command handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Executes the token subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &TokenCommands,
    ) -> Result<(), CliError> {
        let core = self.session.core();
        match command {
            TokenCommands::Create {
                policies,
                ttl,
                default_wrap_ttl,
            } => self.create(out, format, policies, *ttl, *default_wrap_ttl),
            TokenCommands::Lookup => format.write(out, &core.lookup_token(self.session.token()?)?),
            TokenCommands::Renew { increment } => {
                format.write(out, &core.renew_token(self.session.token()?, *increment)?)
            }
            TokenCommands::Revoke => {
                core.revoke_token(self.session.token()?)?;
                format.write(out, &Message::new("Revoked token"))
            }
        }
    }

    fn create<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        policies: &[String],
        ttl: Option<Duration>,
        default_wrap_ttl: Option<Duration>,
    ) -> Result<(), CliError> {
        if policies.is_empty() {
            return Err(CliError::InvalidArgument("at least one policy is required".into()));
        }
        let caller = self.session.caller()?;
        let mut request = TokenRequest::new(policies.to_vec())
            .renewable()
            .with_display_name(format!("token-{}", policies.join("-")));
        if let Some(ttl) = ttl {
            request = request.with_ttl(ttl);
        }
        let issued = self.session.core().create_token(&caller, request, default_wrap_ttl)?;
        format.write(out, &TokenOutput::from(issued))
    }
}
