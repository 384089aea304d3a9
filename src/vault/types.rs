//! Vault Transfer Types
//!
//! Row model for the shared transaction ledger. String codes match the
//! TEXT columns of `transactions_tb`.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payout kind recorded on a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Withdraw,
    Borrow,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Withdraw => "withdraw",
            TransferKind::Borrow => "borrow",
        }
    }

    /// Convert from the ledger's TEXT column
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "withdraw" => Some(TransferKind::Withdraw),
            "borrow" => Some(TransferKind::Borrow),
            _ => None,
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Assets the vault can pay out
///
/// Native transfers go straight through the executor; stablecoin transfers
/// must first present an unspent balance record located on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultAsset {
    Native,
    Stablecoin,
}

impl VaultAsset {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultAsset::Native => "native",
            VaultAsset::Stablecoin => "stablecoin",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "native" => Some(VaultAsset::Native),
            "stablecoin" => Some(VaultAsset::Stablecoin),
            _ => None,
        }
    }
}

impl fmt::Display for VaultAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing status of a ledger row
///
/// A NULL status column and `Pending` are the same unclaimed state; the
/// column may be missing on stores that predate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    Pending,
    Processing,
    Completed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Processing => "processing",
            TransferStatus::Completed => "completed",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(TransferStatus::Pending),
            "processing" => Some(TransferStatus::Processing),
            "completed" => Some(TransferStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a logical transfer: one payout owed to one wallet,
/// conditioned on one originating on-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferKey {
    pub wallet_address: String,
    pub tx_id: String,
    pub kind: TransferKind,
}

impl TransferKey {
    pub fn new(wallet_address: impl Into<String>, tx_id: impl Into<String>, kind: TransferKind) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            tx_id: tx_id.into(),
            kind,
        }
    }
}

impl fmt::Display for TransferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.wallet_address, self.tx_id, self.kind)
    }
}

/// One row of the shared transaction ledger
///
/// Rows are created by the upstream recorder when a user-facing transaction
/// finalizes; this engine only reads them and issues conditional updates.
#[derive(Debug, Clone)]
pub struct TransferRow {
    pub wallet_address: String,
    /// The originating on-chain transaction the payout is conditioned on
    pub tx_id: String,
    pub kind: TransferKind,
    pub asset: VaultAsset,
    /// Asset-native units
    pub amount: Decimal,
    pub status: Option<TransferStatus>,
    /// Set exactly once, on successful payout. Its presence is the sole
    /// source of truth for "already paid", independent of `status`.
    pub vault_tx_id: Option<String>,
    pub vault_explorer_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransferRow {
    pub fn key(&self) -> TransferKey {
        TransferKey {
            wallet_address: self.wallet_address.clone(),
            tx_id: self.tx_id.clone(),
            kind: self.kind,
        }
    }

    /// A row with a vault tx id is terminal and must never be re-paid
    #[inline]
    pub fn is_paid(&self) -> bool {
        self.vault_tx_id.is_some()
    }

    /// Eligible for a claim attempt (NULL and pending are equivalent)
    pub fn is_unclaimed(&self) -> bool {
        !self.is_paid()
            && matches!(self.status, None | Some(TransferStatus::Pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: Option<TransferStatus>, vault_tx_id: Option<&str>) -> TransferRow {
        TransferRow {
            wallet_address: "wallet1".to_string(),
            tx_id: "tx1".to_string(),
            kind: TransferKind::Withdraw,
            asset: VaultAsset::Native,
            amount: Decimal::new(150, 2),
            status,
            vault_tx_id: vault_tx_id.map(String::from),
            vault_explorer_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_code_roundtrip() {
        for kind in [TransferKind::Withdraw, TransferKind::Borrow] {
            assert_eq!(TransferKind::from_code(kind.as_str()), Some(kind));
        }
        for asset in [VaultAsset::Native, VaultAsset::Stablecoin] {
            assert_eq!(VaultAsset::from_code(asset.as_str()), Some(asset));
        }
        for status in [
            TransferStatus::Pending,
            TransferStatus::Processing,
            TransferStatus::Completed,
        ] {
            assert_eq!(TransferStatus::from_code(status.as_str()), Some(status));
        }
        assert!(TransferKind::from_code("deposit").is_none());
        assert!(VaultAsset::from_code("btc").is_none());
    }

    #[test]
    fn test_unclaimed_states() {
        assert!(row(None, None).is_unclaimed());
        assert!(row(Some(TransferStatus::Pending), None).is_unclaimed());
        assert!(!row(Some(TransferStatus::Processing), None).is_unclaimed());
        assert!(!row(Some(TransferStatus::Completed), Some("vt1")).is_unclaimed());
        // vault_tx_id wins over a stale status column
        assert!(!row(Some(TransferStatus::Pending), Some("vt1")).is_unclaimed());
    }

    #[test]
    fn test_key_identity() {
        let a = row(None, None).key();
        let b = TransferKey::new("wallet1", "tx1", TransferKind::Withdraw);
        assert_eq!(a, b);

        let c = TransferKey::new("wallet1", "tx1", TransferKind::Borrow);
        assert_ne!(a, c);
    }
}
