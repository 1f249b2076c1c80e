//! Periodic pruning of expired responses.

use super::store::ResponseCache;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn a task that prunes `cache` every `every`.
///
/// Returns `None` for a disabled cache. Abort the handle to stop pruning.
pub fn spawn_pruner<V>(cache: ResponseCache<V>, every: Duration) -> Option<JoinHandle<()>>
where
    V: Clone + Send + Sync + 'static,
{
    if !cache.is_enabled() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            cache.prune();
        }
    }))
}
