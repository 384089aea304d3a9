//! Collaborator seams for on-chain execution
//!
//! The engine never talks to a node directly; it drives these two traits.
//! The executor is called at most once per claimed row per attempt, and a
//! failed attempt returns the row to pending instead of resubmitting.

use std::fmt::Debug;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::ChainError;
use crate::vault::types::VaultAsset;

/// Inclusive block-height window for a bounded record search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightRange {
    pub start: u64,
    pub end: u64,
}

impl HeightRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

/// An unspent balance record usable as a spend input for a transfer
#[derive(Debug, Clone)]
pub struct BalanceRecord {
    pub id: String,
    /// Block height the record was found at
    pub height: u64,
    /// Opaque record payload, passed through to the executor
    pub data: String,
}

/// Submits one on-chain transfer from the vault's signing key
#[async_trait]
pub trait TransferExecutor: Send + Sync + Debug {
    /// Plain transfer of the given asset. Returns the vault-side tx id.
    async fn transfer(
        &self,
        asset: VaultAsset,
        destination: &str,
        amount: Decimal,
        fee: Decimal,
    ) -> Result<String, ChainError>;

    /// Transfer that must present an unspent balance record as its spend
    /// input (stablecoin sends). Returns the vault-side tx id.
    async fn transfer_with_record(
        &self,
        asset: VaultAsset,
        record: &BalanceRecord,
        destination: &str,
        amount: Decimal,
        fee: Decimal,
    ) -> Result<String, ChainError>;
}

/// Read-only chain queries used by the record locator
#[async_trait]
pub trait ChainLookup: Send + Sync + Debug {
    /// Current chain head height
    async fn current_height(&self) -> Result<u64, ChainError>;

    /// Bounded search for an unspent balance record of `asset` within
    /// `range`. `Ok(None)` means no record in that window.
    async fn find_unspent_record(
        &self,
        asset: VaultAsset,
        range: HeightRange,
    ) -> Result<Option<BalanceRecord>, ChainError>;
}
