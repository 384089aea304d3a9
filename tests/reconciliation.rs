//! End-to-end reconciliation scenarios
//!
//! Exercises the full claim → dispatch → settle flow over the in-memory
//! ledger and mock chain collaborators; no database required.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use vault_engine::chain::mock::{MockExecutor, MockLookup};
use vault_engine::{
    CursorStore, DispatchQueue, FeeSchedule, HeightRange, LocatorConfig, MemoryCursorStore,
    MemoryLedger, ProcessOutcome, ReconciliationWatcher, RecordLocator, TransferKey, TransferKind,
    TransferLedger, TransferRow, TransferStatus, VaultAsset, VaultService, WatcherConfig,
};

struct Harness {
    service: Arc<VaultService>,
    watcher: ReconciliationWatcher,
    ledger: Arc<MemoryLedger>,
    executor: Arc<MockExecutor>,
    lookup: Arc<MockLookup>,
    cursors: Arc<MemoryCursorStore>,
}

fn harness(concurrency: usize) -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let executor = Arc::new(MockExecutor::new());
    let lookup = Arc::new(MockLookup::new(1000));
    let cursors = Arc::new(MemoryCursorStore::new());

    let locator = Arc::new(RecordLocator::new(
        lookup.clone(),
        cursors.clone(),
        LocatorConfig {
            retry_delay: Duration::from_millis(1),
            ..LocatorConfig::default()
        },
    ));

    let service = Arc::new(VaultService::new(
        ledger.clone(),
        executor.clone(),
        locator,
        DispatchQueue::new(concurrency),
        FeeSchedule {
            native: Decimal::new(1, 2),
            stablecoin: Decimal::new(25, 2),
        },
        "https://explorer.test/transaction".to_string(),
    ));

    let watcher = ReconciliationWatcher::new(
        service.clone(),
        ledger.clone(),
        WatcherConfig {
            poll_interval: Duration::from_secs(60),
            batch_size: 10,
        },
    );

    Harness {
        service,
        watcher,
        ledger,
        executor,
        lookup,
        cursors,
    }
}

fn row(wallet: &str, tx: &str, kind: TransferKind, asset: VaultAsset) -> TransferRow {
    TransferRow {
        wallet_address: wallet.to_string(),
        tx_id: tx.to_string(),
        kind,
        asset,
        amount: Decimal::new(1234, 2),
        status: None,
        vault_tx_id: None,
        vault_explorer_url: None,
        created_at: None,
        updated_at: None,
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ============================================================================
// Claim protocol
// ============================================================================

/// Two simultaneous claims for the same pending row: exactly one winner.
#[tokio::test]
async fn concurrent_claims_have_single_winner() {
    let ledger = Arc::new(MemoryLedger::new());
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    let key = r.key();
    ledger.insert(r);

    let a = {
        let ledger = ledger.clone();
        let key = key.clone();
        tokio::spawn(async move { ledger.claim(&key).await.unwrap() })
    };
    let b = {
        let ledger = ledger.clone();
        let key = key.clone();
        tokio::spawn(async move { ledger.claim(&key).await.unwrap() })
    };

    let (won_a, won_b) = (a.await.unwrap(), b.await.unwrap());
    assert!(won_a ^ won_b, "exactly one claimant must win");
}

#[tokio::test]
async fn completion_is_idempotent_across_claimants() {
    let ledger = Arc::new(MemoryLedger::new());
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    let key = r.key();
    ledger.insert(r);

    assert!(ledger.claim(&key).await.unwrap());
    ledger.complete(&key, "vt-first", "url-first").await.unwrap();
    ledger.complete(&key, "vt-second", "url-second").await.unwrap();

    let settled = ledger.get(&key).unwrap();
    assert_eq!(settled.vault_tx_id.as_deref(), Some("vt-first"));
    assert_eq!(settled.status, Some(TransferStatus::Completed));
}

// ============================================================================
// Watcher sweeps
// ============================================================================

#[tokio::test]
async fn watcher_pays_out_all_pending_rows() {
    let h = harness(2);
    h.ledger
        .insert(row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native));
    h.ledger
        .insert(row("w2", "t2", TransferKind::Borrow, VaultAsset::Native));
    h.ledger
        .insert(row("w3", "t3", TransferKind::Withdraw, VaultAsset::Stablecoin));
    h.ledger
        .insert(row("w4", "t4", TransferKind::Borrow, VaultAsset::Stablecoin));

    let queued = h.watcher.tick().await.unwrap();
    assert_eq!(queued, 4);

    let ledger = h.ledger.clone();
    wait_until(move || {
        ["w1", "w2", "w3", "w4"]
            .iter()
            .zip(["t1", "t2", "t3", "t4"])
            .all(|(w, t)| {
                let withdraw = TransferKey::new(*w, t, TransferKind::Withdraw);
                let borrow = TransferKey::new(*w, t, TransferKind::Borrow);
                ledger
                    .get(&withdraw)
                    .or_else(|| ledger.get(&borrow))
                    .unwrap()
                    .is_paid()
            })
    })
    .await;

    // native rows went through the plain path, stablecoin presented records
    assert_eq!(h.executor.transfer_count(), 2);
    assert_eq!(h.executor.record_transfer_count(), 2);
    assert_eq!(h.service.in_flight_len(), 0);

    // nothing left for the next sweep
    assert_eq!(h.watcher.tick().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_payout_is_retried_on_later_tick() {
    let h = harness(1);
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    let key = r.key();
    h.ledger.insert(r);

    h.executor.set_fail(true);
    assert_eq!(h.watcher.tick().await.unwrap(), 1);

    let ledger = h.ledger.clone();
    let k = key.clone();
    wait_until(move || ledger.get(&k).unwrap().status == Some(TransferStatus::Pending)).await;
    assert!(!h.ledger.get(&key).unwrap().is_paid());
    assert_eq!(h.service.in_flight_len(), 0);

    // executor recovers; the next sweep completes the row
    h.executor.set_fail(false);
    assert_eq!(h.watcher.tick().await.unwrap(), 1);

    let ledger = h.ledger.clone();
    let k = key.clone();
    wait_until(move || ledger.get(&k).unwrap().is_paid()).await;
    assert_eq!(
        h.ledger.get(&key).unwrap().status,
        Some(TransferStatus::Completed)
    );
}

/// A row whose payout spans ticks is skipped without a claim attempt.
#[tokio::test]
async fn slow_payout_is_not_dispatched_twice() {
    let h = harness(1);
    h.executor.set_delay(Duration::from_millis(150));
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    h.ledger.insert(r.clone());

    assert_eq!(h.service.process(&r).await.unwrap(), ProcessOutcome::Queued);
    assert_eq!(h.ledger.claim_calls(), 1);

    // second dispatch attempt while the first is still running
    assert_eq!(
        h.service.process(&r).await.unwrap(),
        ProcessOutcome::AlreadyInFlight
    );
    assert_eq!(h.ledger.claim_calls(), 1, "no claim for an in-flight key");

    let ledger = h.ledger.clone();
    let key = r.key();
    wait_until(move || ledger.get(&key).unwrap().is_paid()).await;
    assert_eq!(h.service.in_flight_len(), 0);
}

/// A fetch failure abandons the whole tick: nothing claimed, nothing
/// dispatched, and the next tick after recovery picks the rows up.
#[tokio::test]
async fn unavailable_store_aborts_the_tick() {
    let h = harness(1);
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    let key = r.key();
    h.ledger.insert(r);

    h.ledger.set_fail(true);
    assert!(h.watcher.tick().await.is_err());
    assert_eq!(h.ledger.claim_calls(), 0);
    assert_eq!(h.executor.transfer_count(), 0);

    h.ledger.set_fail(false);
    assert_eq!(h.watcher.tick().await.unwrap(), 1);
    let ledger = h.ledger.clone();
    wait_until(move || ledger.get(&key).unwrap().is_paid()).await;
}

/// A claim that errors (store down mid-dispatch) must drop the in-flight
/// key, or the row would be stuck skipped on every later tick.
#[tokio::test]
async fn claim_error_frees_the_in_flight_key() {
    let h = harness(1);
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    let key = r.key();
    h.ledger.insert(r.clone());

    h.ledger.set_fail(true);
    assert!(h.service.process(&r).await.is_err());
    assert_eq!(h.service.in_flight_len(), 0);
    assert_eq!(h.executor.transfer_count(), 0);

    // the key is free, so a later sweep retries the row
    h.ledger.set_fail(false);
    assert_eq!(h.watcher.tick().await.unwrap(), 1);
    let ledger = h.ledger.clone();
    wait_until(move || ledger.get(&key).unwrap().is_paid()).await;
}

#[tokio::test]
async fn processing_rows_are_left_alone() {
    let h = harness(1);
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Native);
    let key = r.key();
    h.ledger.insert(r);

    // simulate another actor (or a crashed processor) owning the row
    assert!(h.ledger.claim(&key).await.unwrap());

    assert_eq!(h.watcher.tick().await.unwrap(), 0);
    assert_eq!(h.executor.transfer_count(), 0);
    assert_eq!(
        h.ledger.get(&key).unwrap().status,
        Some(TransferStatus::Processing)
    );
}

// ============================================================================
// Record search
// ============================================================================

/// window=50, head=1000, no cursor → [950, 1000]; after success the cursor
/// resumes the next search at 1000.
#[tokio::test]
async fn stablecoin_search_window_and_cursor_resume() {
    let h = harness(1);
    let first = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Stablecoin);
    h.ledger.insert(first.clone());

    assert_eq!(h.watcher.tick().await.unwrap(), 1);
    let ledger = h.ledger.clone();
    let key = first.key();
    wait_until(move || ledger.get(&key).unwrap().is_paid()).await;

    assert_eq!(h.lookup.searched_ranges(), vec![HeightRange::new(950, 1000)]);
    assert_eq!(
        h.cursors.get(VaultAsset::Stablecoin).await.unwrap(),
        Some(1000)
    );

    // chain advances; the next payout searches [1000, 1200]
    h.lookup.set_height(1200);
    let second = row("w2", "t2", TransferKind::Borrow, VaultAsset::Stablecoin);
    h.ledger.insert(second.clone());

    assert_eq!(h.watcher.tick().await.unwrap(), 1);
    let ledger = h.ledger.clone();
    let key = second.key();
    wait_until(move || ledger.get(&key).unwrap().is_paid()).await;

    assert_eq!(
        h.lookup.searched_ranges(),
        vec![HeightRange::new(950, 1000), HeightRange::new(1000, 1200)]
    );
    assert_eq!(
        h.cursors.get(VaultAsset::Stablecoin).await.unwrap(),
        Some(1200)
    );
}

#[tokio::test]
async fn exhausted_record_search_releases_the_row() {
    let h = harness(1);
    h.lookup.set_misses_before_hit(10);
    let r = row("w1", "t1", TransferKind::Withdraw, VaultAsset::Stablecoin);
    let key = r.key();
    h.ledger.insert(r);

    assert_eq!(h.watcher.tick().await.unwrap(), 1);

    let ledger = h.ledger.clone();
    let k = key.clone();
    wait_until(move || ledger.get(&k).unwrap().status == Some(TransferStatus::Pending)).await;
    assert!(!h.ledger.get(&key).unwrap().is_paid());
    assert_eq!(h.executor.record_transfer_count(), 0);
}

// ============================================================================
// Queue discipline under the service
// ============================================================================

#[tokio::test]
async fn payouts_respect_dispatch_concurrency() {
    let h = harness(1);
    h.executor.set_delay(Duration::from_millis(30));
    for i in 0..4 {
        h.ledger.insert(row(
            &format!("w{}", i),
            &format!("t{}", i),
            TransferKind::Withdraw,
            VaultAsset::Native,
        ));
    }

    assert_eq!(h.watcher.tick().await.unwrap(), 4);

    let ledger = h.ledger.clone();
    wait_until(move || {
        (0..4).all(|i| {
            ledger
                .get(&TransferKey::new(
                    format!("w{}", i),
                    format!("t{}", i),
                    TransferKind::Withdraw,
                ))
                .unwrap()
                .is_paid()
        })
    })
    .await;

    assert_eq!(h.executor.transfer_count(), 4);
}
