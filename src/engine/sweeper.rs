//! Periodically evicts fingerprints that have no occurrences left in the
//! window, so the store does not grow with every distinct event ever seen.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::persistence::{error::PersistenceError, traits::EventWindowStore};

/// The eviction sweeper service.
pub struct EvictionSweeper {
    /// The store to sweep.
    store: Arc<dyn EventWindowStore>,
    /// Time between sweeps. Zero disables the sweeper.
    interval: Duration,
    /// Window length in milliseconds.
    window_ms: i64,
    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,
}

impl EvictionSweeper {
    /// Creates a new EvictionSweeper instance.
    pub fn new(
        store: Arc<dyn EventWindowStore>,
        interval: Duration,
        window_ms: i64,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { store, interval, window_ms, cancellation_token }
    }

    /// Runs a single sweep against the current time.
    pub async fn sweep_once(&self) -> Result<usize, PersistenceError> {
        self.store.evict_expired(Utc::now().timestamp_millis(), self.window_ms).await
    }

    /// Starts the long-running sweep loop.
    pub async fn run(self) {
        if self.interval.is_zero() {
            tracing::info!("Eviction sweeper disabled.");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately; nothing is stale at startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("EvictionSweeper cancellation signal received, shutting down...");
                    break;
                }

                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(evicted) => tracing::debug!(evicted, "Eviction sweep completed."),
                        Err(e) => tracing::error!(error = %e, "Eviction sweep failed."),
                    }
                }
            }
        }
    }
}
