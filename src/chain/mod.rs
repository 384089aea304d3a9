//! Chain Collaborators
//!
//! Seams to the node: the transfer executor that moves funds from the
//! vault's signing key, the read-only lookup used to find unspent balance
//! records, and the resumable windowed locator built on top of them.

pub mod cursor;
pub mod error;
pub mod executor;
pub mod locator;
pub mod mock;

pub use cursor::{CursorStore, MemoryCursorStore, PgCursorStore};
pub use error::ChainError;
pub use executor::{BalanceRecord, ChainLookup, HeightRange, TransferExecutor};
pub use locator::{LocatorConfig, RecordLocator};
