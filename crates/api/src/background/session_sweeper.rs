//! Periodic removal of abandoned sessions.
//!
//! A page that never sends `DELETE` (closed tab, dropped network, scripted
//! client) would otherwise keep its images and previews in memory until
//! the server exits. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::sessions::SessionRegistry;

/// Upper bound on how often the sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Sweep interval for `idle_ttl`: never longer than [`SWEEP_INTERVAL`].
pub fn sweep_interval(idle_ttl: Duration) -> Duration {
    idle_ttl.min(SWEEP_INTERVAL)
}

/// Run the idle-session sweep loop.
///
/// Removes sessions untouched for longer than `idle_ttl` every `every`.
/// Runs until `cancel` is triggered.
pub async fn run(
    sessions: Arc<SessionRegistry>,
    idle_ttl: Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        idle_ttl_secs = idle_ttl.as_secs(),
        interval_ms = every.as_millis() as u64,
        "Session sweeper started"
    );

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = sessions.remove_idle(idle_ttl).await;
                if removed > 0 {
                    tracing::info!(removed, "Session sweeper: removed idle sessions");
                } else {
                    tracing::debug!("Session sweeper: nothing to remove");
                }
            }
        }
    }
}
