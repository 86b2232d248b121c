//! Periodic sweep of idle keys out of the quota ledger.
//!
//! Request-path pruning only trims a key's timestamps; it never removes the
//! key. On a long-lived process this task keeps the key space bounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::{Clock, QuotaLedger};

pub struct IdleKeyEvictor {
    ledger: Arc<QuotaLedger>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl IdleKeyEvictor {
    pub fn new(ledger: Arc<QuotaLedger>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            ledger,
            clock,
            interval,
        }
    }

    /// One sweep. Returns the number of keys removed.
    pub fn sweep(&self) -> usize {
        self.ledger.evict_idle(self.clock.now())
    }

    /// Sweep every `interval` until `shutdown_rx` flips to `true`.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        debug!(interval_secs = self.interval.as_secs(), "idle key evictor started");
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Idle key evictor shutting down");
                        return;
                    }
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.sweep();
                }
            }
        }
    }
}
