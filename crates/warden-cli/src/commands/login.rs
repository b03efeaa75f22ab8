//! `warden login`.

use std::io::Write;

use crate::cli::LoginArgs;
use crate::error::CliError;
use crate::output::OutputFormat;
use crate::session::Session;

/// Handler for `login`.
pub struct LoginCommand<'a> {
    session: &'a Session,
}

impl<'a> LoginCommand<'a> {
    /// Creates a new login handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Exchanges a secret-id for a client token.
    ///
    /// # Errors
    ///
    /// Returns an invalid-credentials error on any mismatch.
    pub fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat, args: &LoginArgs) -> Result<(), CliError> {
        let issuer = self.session.issuer(&args.mount)?;
        let response = issuer.login(&args.role, args.secret_id.as_deref(), args.client_addr)?;
        format.write(out, &response)
    }
}
