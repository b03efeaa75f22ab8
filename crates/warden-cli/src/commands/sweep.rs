//! `warden sweep`.

use std::io::Write;
use std::sync::Arc;

use tracing::info;
use warden_core::spawn_sweeper;

use crate::error::CliError;
use crate::output::OutputFormat;
use crate::session::Session;

/// Handler for `sweep`.
pub struct SweepCommand<'a> {
    session: &'a Session,
}

impl<'a> SweepCommand<'a> {
    /// Creates a new sweep handler.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Runs one sweep pass, or with `watch` keeps sweeping on the configured
    /// interval until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error if output or signal handling fails, or with `watch` if
    /// sweeping is disabled in the config.
    pub async fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat, watch: bool) -> Result<(), CliError> {
        let core = Arc::clone(self.session.core());
        if !watch {
            let report = tokio::task::spawn_blocking(move || core.sweep_once())
                .await
                .map_err(|e| CliError::Config(format!("sweep task failed: {e}")))?;
            return format.write(out, &report);
        }

        if !core.config().sweep.enabled {
            return Err(CliError::Config("background sweeping is disabled (sweep.enabled)".into()));
        }
        let interval = core.config().sweep.interval;
        let handle = spawn_sweeper(core, interval);
        info!(interval = %humantime::format_duration(interval), "Sweeping until interrupted");
        tokio::signal::ctrl_c().await?;
        handle.shutdown().await;
        Ok(())
    }
}
