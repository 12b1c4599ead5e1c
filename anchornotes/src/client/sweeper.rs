use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::RelevanceStore;

/// Periodically drops relevant-note entries that outlived their TTL.
///
/// Per-entry timers cover reminders fired while the client is running; the
/// sweep catches entries whose timer never ran, e.g. across a suspend.
#[derive(Clone, Debug)]
pub struct ExpirySweeper {
    store: RelevanceStore,
    interval_secs: u64,
}

impl ExpirySweeper {
    pub fn new(store: RelevanceStore, interval_secs: u64) -> Self {
        Self {
            store,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Runs a single sweep. Returns the number of entries removed.
    pub fn run_once(&self) -> usize {
        let removed = self.store.clear_expired();
        if removed > 0 {
            info!(store = self.store.key(), removed, "Expired relevance entries removed");
        } else {
            debug!(store = self.store.key(), "No expired relevance entries");
        }
        removed
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Sweeps every `interval_secs` until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(store = self.store.key(), "Expiry sweeper shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(self.interval_secs)) => {
                        self.run_once();
                    }
                }
            }
        })
    }
}
