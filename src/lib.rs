//! vault_engine - Custodial Vault Payout Engine
//!
//! Reconciles a shared transaction ledger against on-chain payouts: claims
//! rows via conditional updates, bounds executor concurrency through a FIFO
//! dispatch queue, sweeps for stuck transfers on a timer, and locates
//! spendable balance records with a resumable windowed search.
//!
//! # Modules
//!
//! - [`vault`] - claim protocol, dispatch queue, watcher, submission service
//! - [`chain`] - executor/lookup seams, record locator, resume cursors
//! - [`config`] - YAML configuration with clamped engine knobs
//! - [`db`] - PostgreSQL pool management
//! - [`logging`] - tracing setup

pub mod chain;
pub mod config;
pub mod db;
pub mod logging;
pub mod vault;

// Convenient re-exports at crate root
pub use chain::{
    BalanceRecord, ChainError, ChainLookup, CursorStore, HeightRange, LocatorConfig,
    MemoryCursorStore, PgCursorStore, RecordLocator, TransferExecutor,
};
pub use config::{AppConfig, EngineConfig};
pub use db::Database;
pub use vault::{
    DispatchQueue, FeeSchedule, MemoryLedger, PgLedger, ProcessOutcome, ReconciliationWatcher,
    TransferKey, TransferKind, TransferLedger, TransferRow, TransferStatus, VaultAsset,
    VaultError, VaultService, WatcherConfig,
};
