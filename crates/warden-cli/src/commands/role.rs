//! Role management command implementation.

use std::io::Write;

use warden_approle::RoleRequest;

use crate::cli::{RoleCommands, RoleWriteArgs};
use crate::error::CliError;
use crate::output::{Message, NameList, OutputFormat};
use crate::session::Session;

/// Handler for role subcommands.
pub struct RoleCommand<'a> {
    session: &'a Session,
}

impl<'a> RoleCommand<'a> {
    /// Creates a new role command handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Executes the role subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &RoleCommands,
    ) -> Result<(), CliError> {
        let caller = self.session.caller()?;
        match command {
            RoleCommands::Write(args) => {
                let issuer = self.session.issuer(&args.mount)?;
                let role = issuer.write_role(&caller, &args.name, role_request(args))?;
                format.write(out, &role)
            }
            RoleCommands::Read { name, mount } => {
                let role = self.session.issuer(mount)?.read_role(&caller, name)?;
                format.write(out, &role)
            }
            RoleCommands::Delete { name, mount } => {
                self.session.issuer(mount)?.delete_role(&caller, name)?;
                format.write(out, &Message::new(format!("Deleted role '{name}'")))
            }
            RoleCommands::List { mount } => {
                let roles = self.session.issuer(mount)?.list_roles(&caller)?;
                format.write(out, &NameList::new("Roles", roles))
            }
        }
    }
}

fn role_request(args: &RoleWriteArgs) -> RoleRequest {
    RoleRequest {
        policies: args.policies.clone(),
        bind_secret_id: args.no_bind_secret_id.then_some(false),
        secret_id_ttl: args.secret_id_ttl,
        secret_id_num_uses: args.secret_id_num_uses,
        secret_id_bound_cidrs: args.bound_cidrs.clone(),
        token_ttl: args.token_ttl,
        token_max_ttl: args.token_max_ttl,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn write_args(argv: &[&str]) -> RoleWriteArgs {
        let mut full = vec!["warden", "role", "write"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Role {
                command: RoleCommands::Write(args),
            } => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unset_flags_stay_unset() {
        let request = role_request(&write_args(&["web", "--secret-id-num-uses", "3"]));
        assert_eq!(request.secret_id_num_uses, Some(3));
        assert!(request.policies.is_none());
        assert!(request.bind_secret_id.is_none());
        assert!(request.secret_id_bound_cidrs.is_none());
    }

    #[test]
    fn no_bind_secret_id_clears_binding() {
        let request = role_request(&write_args(&["web", "--no-bind-secret-id", "--bound-cidr", "10.0.0.0/8"]));
        assert_eq!(request.bind_secret_id, Some(false));
        assert_eq!(request.secret_id_bound_cidrs, Some(vec!["10.0.0.0/8".to_string()]));
    }
}
