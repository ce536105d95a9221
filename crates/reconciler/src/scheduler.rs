//! Fixed-interval job runner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// A unit of background work run on a fixed cadence.
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    /// Label used in logs.
    fn name(&self) -> &'static str;

    /// Runs one pass. Errors are handled inside the job.
    async fn tick(&self);
}

/// Spawns a task that runs `job` every `period` until `shutdown` is notified.
///
/// The first pass runs immediately. Ticks missed while a pass is still running
/// are skipped rather than queued, so passes never overlap.
pub fn spawn_periodic<J: PeriodicJob>(
    job: J,
    period: Duration,
    shutdown: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(job = job.name(), ?period, "periodic job started");

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!(job = job.name(), "periodic job stopping");
                    break;
                }
                _ = ticker.tick() => {
                    job.tick().await;
                }
            }
        }
    })
}
