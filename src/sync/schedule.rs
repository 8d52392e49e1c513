use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;

use super::SyncEngine;
use crate::config::SyncConfig;

/// Runs a pass right away and then once per `every` until `shutdown`
/// resolves. Passes never overlap: a tick that fires while a pass is running
/// waits for it, and a running pass is always allowed to finish.
///
/// `shutdown` is polled before every tick, including the first, so a signal
/// listener inside it is registered before any pass starts.
pub async fn run_periodic<F>(
    engine: &mut SyncEngine,
    config: &SyncConfig,
    every: Duration,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    let mut tick = tokio::time::interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut passes = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(passes, "stopping periodic sync");
                break;
            }
            _ = tick.tick() => {
                // Failures are already logged and notified by the engine.
                let _ = engine.run(config).await;
                passes += 1;
            }
        }
    }

    passes
}
