//! Background expiry sweeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::instance::Core;

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the current pass to finish.
    pub async fn shutdown(self) {
        // The task may already have exited; nothing to signal then.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Expiry sweeper task failed");
        }
    }

    /// Returns true if the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a task that calls [`Core::sweep_once`] every `every`.
///
/// The first pass runs one interval after spawning. Passes run on the
/// blocking pool since storage I/O is synchronous.
///
/// # Panics
///
/// Must be called within a tokio runtime.
pub fn spawn(core: Arc<Core>, every: Duration) -> SweeperHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(interval_secs = every.as_secs(), "Starting expiry sweeper");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let core = Arc::clone(&core);
                    match tokio::task::spawn_blocking(move || core.sweep_once()).await {
                        Ok(report) => debug!(
                            scanned = report.scanned,
                            removed = report.removed,
                            failed = report.failed,
                            "Expiry sweep finished"
                        ),
                        Err(e) => warn!(error = %e, "Expiry sweep pass panicked"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Expiry sweeper shutting down");
                        break;
                    }
                }
            }
        }
    });

    SweeperHandle { shutdown, task }
}
