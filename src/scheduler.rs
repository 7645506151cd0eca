//! Interval scheduler driving the watch runner.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::runner::WatchRunner;

/// Spawn the watch loop: one run per tick, failures logged and swallowed so
/// the loop outlives any single bad run.
pub fn spawn(runner: Arc<WatchRunner>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = runner.run_once().await {
                warn!(error = %e, "watch run failed");
            }
        }
    })
}
