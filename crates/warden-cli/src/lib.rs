//! # Warden CLI
//!
//! Operator commands for a Warden data directory: policies, AppRole roles
//! and secret-ids, response unwrapping, login and expiry sweeping.
//!
//! Every invocation opens the directory, performs one operation and exits;
//! state persists in the directory between runs.

#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod session;

use std::io::Write;

pub use error::CliError;

use cli::{Cli, Commands};
use commands::{
    InitCommand, LoginCommand, MountCommand, PolicyCommand, RoleCommand, SecretIdCommand,
    SweepCommand, TokenCommand, WrappingCommand,
};
use output::OutputFormat;
use session::{load_config, Session};

/// Runs one parsed command, writing its output to `out`.
///
/// # Errors
///
/// Returns the command's error.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);

    if matches!(cli.command, Commands::Init) {
        let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
        return InitCommand::new(config).execute(out, &format);
    }

    let session = Session::open(&cli)?;
    match &cli.command {
        Commands::Init => Ok(()),
        Commands::Policy { command } => PolicyCommand::new(&session).execute(out, &format, command),
        Commands::Mount { command } => MountCommand::new(&session).execute(out, &format, command),
        Commands::Role { command } => RoleCommand::new(&session).execute(out, &format, command),
        Commands::SecretId { command } => SecretIdCommand::new(&session).execute(out, &format, command),
        Commands::Token { command } => TokenCommand::new(&session).execute(out, &format, command),
        Commands::Unwrap { wrapping_token } => {
            WrappingCommand::new(&session).unwrap(out, &format, wrapping_token)
        }
        Commands::Wrapping { command } => WrappingCommand::new(&session).execute(out, &format, command),
        Commands::Login(args) => LoginCommand::new(&session).execute(out, &format, args),
        Commands::Sweep { watch } => SweepCommand::new(&session).execute(out, &format, *watch).await,
    }
}
