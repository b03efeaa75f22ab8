//! Secret-id command implementation.

use std::io::Write;

use warden_approle::SecretIdRequest;

use crate::cli::{SecretIdCommands, SecretIdIssueArgs};
use crate::error::CliError;
use crate::output::{Message, NameList, OutputFormat};
use crate::session::Session;

/// Handler for secret-id subcommands.
pub struct SecretIdCommand<'a> {
    session: &'a Session,
}

impl<'a> SecretIdCommand<'a> {
    /// Creates a new secret-id command handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Executes the secret-id subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &SecretIdCommands,
    ) -> Result<(), CliError> {
        let caller = self.session.caller()?;
        match command {
            SecretIdCommands::Issue(args) => {
                let issuer = self.session.issuer(&args.mount)?;
                let request = secret_id_request(args)?;
                let response = match &args.value {
                    Some(value) => issuer.create_custom_secret_id(&caller, &args.role, value, request)?,
                    None => issuer.issue_secret_id(&caller, &args.role, request)?,
                };
                format.write(out, &response)
            }
            SecretIdCommands::Lookup { role, accessor, mount } => {
                let info = self
                    .session
                    .issuer(mount)?
                    .lookup_secret_id_accessor(&caller, role, accessor)?;
                format.write(out, &info)
            }
            SecretIdCommands::Revoke { role, accessor, mount } => {
                self.session
                    .issuer(mount)?
                    .revoke_secret_id_accessor(&caller, role, accessor)?;
                format.write(out, &Message::new(format!("Destroyed secret-id {accessor}")))
            }
            SecretIdCommands::List { role, mount } => {
                let accessors = self.session.issuer(mount)?.list_secret_id_accessors(&caller, role)?;
                format.write(out, &NameList::new("Accessors", accessors))
            }
        }
    }
}

fn secret_id_request(args: &SecretIdIssueArgs) -> Result<SecretIdRequest, CliError> {
    let mut request = SecretIdRequest::new().with_cidrs(args.cidrs.clone());
    if let Some(ttl) = args.wrap_ttl {
        request = request.wrapped(ttl);
    }
    for pair in &args.metadata {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::InvalidArgument(format!(
                "metadata '{pair}' must be KEY=VALUE"
            )));
        };
        if key.trim().is_empty() {
            return Err(CliError::InvalidArgument(format!("metadata '{pair}' has an empty key")));
        }
        request = request.with_metadata(key.trim(), value);
    }
    Ok(request)
}
