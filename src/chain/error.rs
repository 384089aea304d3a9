//! Chain collaborator error types

use thiserror::Error;

/// Failures from the transfer executor and the chain lookup
#[derive(Debug, Error, Clone)]
pub enum ChainError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid destination address")]
    InvalidAddress,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Insufficient vault balance")]
    InsufficientBalance,

    #[error("Unsupported asset for this operation")]
    UnsupportedAsset,

    #[error("Node RPC error: {0}")]
    Rpc(String),
}
