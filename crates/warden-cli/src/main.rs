//! Warden CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use warden_cli::cli::Cli;
use warden_cli::session::load_config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The config only decides the fallback filter and format; a broken one
    // is reported by the command itself.
    let log = load_config(cli.config.as_deref(), cli.data_dir.as_deref())
        .map(|config| config.log)
        .unwrap_or_default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
    let mut stdout = io::stdout().lock();
    runtime.block_on(warden_cli::run(cli, &mut stdout))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
