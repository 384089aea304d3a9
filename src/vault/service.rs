//! Vault Service
//!
//! Single submission path shared by the API layer and the reconciliation
//! watcher: claim the row, run the payout through the dispatch queue, and
//! settle the row on the task's outcome. The caller gets an immediate
//! answer; the payout itself is observed later through the row's
//! `status` / `vault_tx_id`.

use std::sync::Arc;

use dashmap::DashSet;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use super::error::VaultError;
use super::ledger::TransferLedger;
use super::queue::{DispatchQueue, TaskResult};
use super::types::{TransferKey, TransferKind, TransferRow, VaultAsset};
use crate::chain::executor::TransferExecutor;
use crate::chain::locator::RecordLocator;

/// Immediate outcome of a submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Row claimed and payout enqueued; settlement happens in the background
    Queued,
    /// This process is already paying the row out; nothing was claimed
    AlreadyInFlight,
    /// Another actor owns the row (claim matched no rows), or it is paid
    NotClaimed,
}

/// Per-asset network fee charged on payouts
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    pub native: Decimal,
    pub stablecoin: Decimal,
}

impl FeeSchedule {
    fn for_asset(&self, asset: VaultAsset) -> Decimal {
        match asset {
            VaultAsset::Native => self.native,
            VaultAsset::Stablecoin => self.stablecoin,
        }
    }
}

pub struct VaultService {
    ledger: Arc<dyn TransferLedger>,
    executor: Arc<dyn TransferExecutor>,
    locator: Arc<RecordLocator>,
    queue: DispatchQueue,
    /// Keys being paid out by this process. Advisory only: it cuts
    /// duplicate claim traffic, the ledger's conditional updates stay the
    /// arbitration point.
    in_flight: Arc<DashSet<TransferKey>>,
    fees: FeeSchedule,
    explorer_base: String,
}

impl VaultService {
    pub fn new(
        ledger: Arc<dyn TransferLedger>,
        executor: Arc<dyn TransferExecutor>,
        locator: Arc<RecordLocator>,
        queue: DispatchQueue,
        fees: FeeSchedule,
        explorer_base: String,
    ) -> Self {
        Self {
            ledger,
            executor,
            locator,
            queue,
            in_flight: Arc::new(DashSet::new()),
            fees,
            explorer_base,
        }
    }

    /// Keys currently being paid out by this process
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Claim `row` and enqueue its payout.
    ///
    /// Returns immediately; on task success the row is completed with the
    /// returned vault tx id, on task failure it is released back to pending
    /// for a later watcher tick. The in-flight key is dropped on both
    /// branches.
    pub async fn process(&self, row: &TransferRow) -> Result<ProcessOutcome, VaultError> {
        let key = row.key();

        if row.is_paid() {
            debug!(key = %key, "Row already paid, skipping");
            return Ok(ProcessOutcome::NotClaimed);
        }

        // In-flight check comes before any claim traffic: a slow payout can
        // span several watcher ticks and must not be claimed twice here.
        if !self.in_flight.insert(key.clone()) {
            debug!(key = %key, "Row already in flight, skipping");
            return Ok(ProcessOutcome::AlreadyInFlight);
        }

        let won = match self.ledger.claim(&key).await {
            Ok(won) => won,
            Err(e) => {
                self.in_flight.remove(&key);
                return Err(e);
            }
        };
        if !won {
            self.in_flight.remove(&key);
            debug!(key = %key, "Claim lost, another actor owns the row");
            return Ok(ProcessOutcome::NotClaimed);
        }

        info!(
            key = %key,
            asset = %row.asset,
            amount = %row.amount,
            "Claimed transfer, enqueueing payout"
        );

        let result_fut = self.queue.submit(self.build_task(row));

        let ledger = Arc::clone(&self.ledger);
        let in_flight = Arc::clone(&self.in_flight);
        let explorer_base = self.explorer_base.clone();
        tokio::spawn(async move {
            settle(ledger, &key, result_fut.await, &explorer_base).await;
            // unconditional: success, failure, or settlement error
            in_flight.remove(&key);
        });

        Ok(ProcessOutcome::Queued)
    }

    fn build_task(
        &self,
        row: &TransferRow,
    ) -> impl std::future::Future<Output = TaskResult> + Send + 'static {
        let executor = Arc::clone(&self.executor);
        let locator = Arc::clone(&self.locator);
        let fee = self.fees.for_asset(row.asset);
        let destination = row.wallet_address.clone();
        let amount = row.amount;
        let kind = row.kind;
        let asset = row.asset;

        async move {
            match (kind, asset) {
                (TransferKind::Withdraw, VaultAsset::Native) => {
                    executor
                        .transfer(asset, &destination, amount, fee)
                        .await
                        .map_err(VaultError::from)
                }
                (TransferKind::Borrow, VaultAsset::Native) => {
                    executor
                        .transfer(asset, &destination, amount, fee)
                        .await
                        .map_err(VaultError::from)
                }
                (TransferKind::Withdraw, VaultAsset::Stablecoin) => {
                    let record = locator.locate(asset).await?;
                    executor
                        .transfer_with_record(asset, &record, &destination, amount, fee)
                        .await
                        .map_err(VaultError::from)
                }
                (TransferKind::Borrow, VaultAsset::Stablecoin) => {
                    let record = locator.locate(asset).await?;
                    executor
                        .transfer_with_record(asset, &record, &destination, amount, fee)
                        .await
                        .map_err(VaultError::from)
                }
            }
        }
    }
}

/// Settle the ledger row from the payout task's outcome
///
/// Failures here are contained and logged; they never take the process
/// down. A completion that fails to persist leaves the row `processing`
/// for operator recovery, mirroring a mid-payout crash.
async fn settle(
    ledger: Arc<dyn TransferLedger>,
    key: &TransferKey,
    outcome: TaskResult,
    explorer_base: &str,
) {
    match outcome {
        Ok(vault_tx_id) => {
            let explorer_url = format!("{}/{}", explorer_base, vault_tx_id);
            match ledger.complete(key, &vault_tx_id, &explorer_url).await {
                Ok(()) => info!(key = %key, vault_tx_id = %vault_tx_id, "Payout completed"),
                Err(e) => error!(
                    key = %key,
                    vault_tx_id = %vault_tx_id,
                    error = %e,
                    "Payout sent but completion update failed"
                ),
            }
        }
        Err(e) => {
            error!(key = %key, error = %e, "Payout task failed, releasing row");
            if let Err(release_err) = ledger.release(key).await {
                error!(
                    key = %key,
                    error = %release_err,
                    "Failed to release row after payout failure"
                );
            }
        }
    }
}
