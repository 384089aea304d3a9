//! Vault Transfer Reconciliation
//!
//! Pays out withdraw/borrow transfers owed to user wallets once the
//! originating on-chain transaction has been recorded.
//!
//! # Flow
//!
//! ```text
//! trigger (API / watcher tick)
//!     → claim row          (conditional UPDATE, rows_affected = ownership)
//!     → enqueue payout     (FIFO queue, bounded concurrency)
//!     → executor.transfer
//!     → complete row       (vault_tx_id set once, guarded)  |  release row
//! ```
//!
//! # Safety Invariants
//!
//! 1. A row with a non-null `vault_tx_id` is terminal: never re-claimed,
//!    never re-paid.
//! 2. At most one payout task per row per process (in-flight key set);
//!    at most one effective completion across processes (ledger guard).
//! 3. At most `dispatch_concurrency` executor calls at any instant.
//! 4. Rows stuck in `processing` after a crash are operator-recovery
//!    cases; the watcher never reclaims them.

pub mod error;
pub mod ledger;
pub mod queue;
pub mod service;
pub mod types;
pub mod watcher;

// Re-exports for convenience
pub use error::VaultError;
pub use ledger::{MemoryLedger, PgLedger, TransferLedger};
pub use queue::{DispatchQueue, TaskResult};
pub use service::{FeeSchedule, ProcessOutcome, VaultService};
pub use types::{TransferKey, TransferKind, TransferRow, TransferStatus, VaultAsset};
pub use watcher::{ReconciliationWatcher, WatcherConfig};
