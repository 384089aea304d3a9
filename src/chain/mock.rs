//! Mock chain collaborators
//!
//! Deterministic stand-ins for the transfer executor and the chain lookup,
//! with failure toggles and call counters. Used by tests and by the binary
//! until a real signer is wired in behind the same traits.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::ChainError;
use super::executor::{BalanceRecord, ChainLookup, HeightRange, TransferExecutor};
use crate::vault::types::VaultAsset;

/// Mock transfer executor returning fake vault tx ids
#[derive(Debug, Default)]
pub struct MockExecutor {
    fail: AtomicBool,
    delay_ms: AtomicU64,
    transfer_calls: AtomicUsize,
    record_transfer_calls: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent transfer fail with a network error
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Hold each transfer open for `delay` before resolving
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn transfer_count(&self) -> usize {
        self.transfer_calls.load(Ordering::SeqCst)
    }

    pub fn record_transfer_count(&self) -> usize {
        self.record_transfer_calls.load(Ordering::SeqCst)
    }

    async fn submit(&self) -> Result<String, ChainError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChainError::Network("mock transfer failure".to_string()));
        }
        Ok(format!("vt{:x}", uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl TransferExecutor for MockExecutor {
    async fn transfer(
        &self,
        _asset: VaultAsset,
        _destination: &str,
        _amount: Decimal,
        _fee: Decimal,
    ) -> Result<String, ChainError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.submit().await
    }

    async fn transfer_with_record(
        &self,
        _asset: VaultAsset,
        _record: &BalanceRecord,
        _destination: &str,
        _amount: Decimal,
        _fee: Decimal,
    ) -> Result<String, ChainError> {
        self.record_transfer_calls.fetch_add(1, Ordering::SeqCst);
        self.submit().await
    }
}

/// Mock chain lookup with a settable head height
///
/// Serves a record on each search unless primed with misses, and remembers
/// every range it was asked to search.
#[derive(Debug)]
pub struct MockLookup {
    height: AtomicU64,
    fail: AtomicBool,
    misses_before_hit: AtomicU32,
    searched: Mutex<Vec<HeightRange>>,
}

impl MockLookup {
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
            fail: AtomicBool::new(false),
            misses_before_hit: AtomicU32::new(0),
            searched: Mutex::new(Vec::new()),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Return `Ok(None)` for the next `misses` searches
    pub fn set_misses_before_hit(&self, misses: u32) {
        self.misses_before_hit.store(misses, Ordering::SeqCst);
    }

    /// Every range passed to `find_unspent_record`, in call order
    pub fn searched_ranges(&self) -> Vec<HeightRange> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainLookup for MockLookup {
    async fn current_height(&self) -> Result<u64, ChainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("mock node down".to_string()));
        }
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn find_unspent_record(
        &self,
        _asset: VaultAsset,
        range: HeightRange,
    ) -> Result<Option<BalanceRecord>, ChainError> {
        self.searched.lock().unwrap().push(range);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("mock node down".to_string()));
        }

        let misses = self.misses_before_hit.load(Ordering::SeqCst);
        if misses > 0 {
            self.misses_before_hit.store(misses - 1, Ordering::SeqCst);
            return Ok(None);
        }

        Ok(Some(BalanceRecord {
            id: format!("rec{:x}", uuid::Uuid::new_v4().simple()),
            height: range.end,
            data: "record-ciphertext".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_executor_failure_toggle() {
        let executor = MockExecutor::new();
        assert!(
            executor
                .transfer(VaultAsset::Native, "w1", Decimal::ONE, Decimal::ZERO)
                .await
                .is_ok()
        );

        executor.set_fail(true);
        assert!(
            executor
                .transfer(VaultAsset::Native, "w1", Decimal::ONE, Decimal::ZERO)
                .await
                .is_err()
        );
        assert_eq!(executor.transfer_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_lookup_misses_then_hit() {
        let lookup = MockLookup::new(1000);
        lookup.set_misses_before_hit(2);

        let range = HeightRange::new(950, 1000);
        assert!(
            lookup
                .find_unspent_record(VaultAsset::Stablecoin, range)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            lookup
                .find_unspent_record(VaultAsset::Stablecoin, range)
                .await
                .unwrap()
                .is_none()
        );
        let record = lookup
            .find_unspent_record(VaultAsset::Stablecoin, range)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.height, 1000);
        assert_eq!(lookup.searched_ranges().len(), 3);
    }
}
