//! Reconciliation Watcher
//!
//! Timer-driven sweep for transfers nobody is paying out: rows the API
//! path never picked up, and rows released back to pending after a failed
//! attempt. Rows stuck in `processing` are deliberately left alone; a
//! crashed processor is an operator-recovery case, not something this loop
//! guesses about.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::error::VaultError;
use super::ledger::TransferLedger;
use super::service::{ProcessOutcome, VaultService};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Time between sweeps; floored at [`WatcherConfig::MIN_POLL_INTERVAL`]
    pub poll_interval: Duration,
    /// Rows fetched per sweep; clamped to 1..=[`WatcherConfig::MAX_BATCH_SIZE`]
    pub batch_size: u32,
}

impl WatcherConfig {
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(15);
    pub const MAX_BATCH_SIZE: u32 = 50;

    /// Clamp out-of-range values instead of rejecting them
    pub fn normalized(mut self) -> Self {
        if self.poll_interval < Self::MIN_POLL_INTERVAL {
            self.poll_interval = Self::MIN_POLL_INTERVAL;
        }
        self.batch_size = self.batch_size.clamp(1, Self::MAX_BATCH_SIZE);
        self
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            batch_size: 10,
        }
    }
}

pub struct ReconciliationWatcher {
    service: Arc<VaultService>,
    ledger: Arc<dyn TransferLedger>,
    config: WatcherConfig,
}

impl ReconciliationWatcher {
    pub fn new(
        service: Arc<VaultService>,
        ledger: Arc<dyn TransferLedger>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            service,
            ledger,
            config: config.normalized(),
        }
    }

    /// Run the watcher loop forever
    pub async fn run(&self) -> ! {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Starting reconciliation watcher"
        );

        loop {
            match self.tick().await {
                Ok(0) => debug!("No unprocessed transfers"),
                Ok(queued) => info!(queued, "Queued unprocessed transfers"),
                // store unavailable etc: nothing partial was persisted,
                // the next tick retries naturally
                Err(e) => error!(error = %e, "Reconciliation tick abandoned"),
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One fetch-and-dispatch cycle; returns how many rows were queued.
    ///
    /// Rows are fetched oldest-first but dispatched concurrently up to the
    /// queue's limit, so completion order is not guaranteed. Per-row
    /// failures are logged and contained; only the fetch itself can abort
    /// the tick.
    pub async fn tick(&self) -> Result<usize, VaultError> {
        let rows = self
            .ledger
            .fetch_unprocessed(self.config.batch_size as i64)
            .await?;

        if rows.is_empty() {
            return Ok(0);
        }

        debug!(count = rows.len(), "Fetched unprocessed transfers");

        let mut queued = 0;
        for row in rows {
            match self.service.process(&row).await {
                Ok(ProcessOutcome::Queued) => queued += 1,
                Ok(ProcessOutcome::AlreadyInFlight) => {
                    debug!(wallet = %row.wallet_address, tx = %row.tx_id, "Still in flight, skipped");
                }
                Ok(ProcessOutcome::NotClaimed) => {
                    debug!(wallet = %row.wallet_address, tx = %row.tx_id, "Claimed elsewhere, skipped");
                }
                Err(e) => {
                    error!(
                        wallet = %row.wallet_address,
                        tx = %row.tx_id,
                        error = %e,
                        "Failed to dispatch transfer"
                    );
                }
            }
        }

        Ok(queued)
    }
}
