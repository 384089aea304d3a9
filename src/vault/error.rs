//! Vault Engine Error Types
//!
//! A lost claim is not an error anywhere in this crate: it is the normal
//! "another actor owns the row" signal and travels as a plain `bool`.

use thiserror::Error;

use crate::chain::error::ChainError;

#[derive(Debug, Error, Clone)]
pub enum VaultError {
    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Invalid search range: start {start} >= end {end}")]
    InvalidSearchRange { start: u64, end: u64 },

    #[error("No unspent balance record found after {attempts} attempts")]
    RecordNotFound { attempts: u32 },

    #[error("Malformed ledger row: {0}")]
    MalformedRow(String),

    #[error("Dispatch queue dropped the task result")]
    TaskDropped,
}

impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}
