//! Record Locator - resumable windowed search
//!
//! The node's record lookup cannot scan an entire long-lived chain, so the
//! search is bounded to a height window. The window trades completeness for
//! latency; the persisted cursor shrinks the effective region to "since the
//! last hit" across repeated calls.
//!
//! Range resolution, in priority order:
//! 1. operator-configured fixed `[start, end]` range, used verbatim
//! 2. persisted resume cursor (when below the chain head): `[cursor, head]`
//! 3. trailing window: `[head - W, head]`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::cursor::CursorStore;
use super::executor::{BalanceRecord, ChainLookup, HeightRange};
use crate::vault::error::VaultError;
use crate::vault::types::VaultAsset;

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Trailing window size when no cursor or override exists
    pub window: u64,
    /// Operator override; validated but otherwise used verbatim
    pub fixed_range: Option<HeightRange>,
    /// Lookup attempts before giving up
    pub retry_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            window: 50,
            fixed_range: None,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct RecordLocator {
    lookup: Arc<dyn ChainLookup>,
    cursors: Arc<dyn CursorStore>,
    config: LocatorConfig,
}

impl RecordLocator {
    pub fn new(
        lookup: Arc<dyn ChainLookup>,
        cursors: Arc<dyn CursorStore>,
        config: LocatorConfig,
    ) -> Self {
        Self {
            lookup,
            cursors,
            config,
        }
    }

    /// Resolve the search window for `asset` without issuing any lookup
    pub async fn resolve_range(&self, asset: VaultAsset) -> Result<HeightRange, VaultError> {
        if let Some(range) = self.config.fixed_range {
            validate(range)?;
            return Ok(range);
        }

        let head = self.lookup.current_height().await?;
        let range = match self.cursors.get(asset).await? {
            Some(cursor) if cursor < head => HeightRange::new(cursor, head),
            _ => HeightRange::new(head.saturating_sub(self.config.window), head),
        };
        validate(range)?;
        Ok(range)
    }

    /// Find an unspent balance record for `asset`.
    ///
    /// Retries with a fixed delay up to the configured attempt count; there
    /// is no early-exit hook. On a hit, the cursor is advanced to the
    /// window's end so the next search starts where this one stopped.
    pub async fn locate(&self, asset: VaultAsset) -> Result<BalanceRecord, VaultError> {
        let range = self.resolve_range(asset).await?;
        debug!(
            asset = %asset,
            start = range.start,
            end = range.end,
            "Searching for unspent record"
        );

        let attempts = self.config.retry_attempts.max(1);
        let mut last_err: Option<VaultError> = None;

        for attempt in 1..=attempts {
            match self.lookup.find_unspent_record(asset, range).await {
                Ok(Some(record)) => {
                    // Cursor persistence is best-effort: losing it only
                    // widens the next search window.
                    if let Err(e) = self.cursors.set(asset, range.end).await {
                        warn!(asset = %asset, error = %e, "Failed to persist resume cursor");
                    }
                    info!(
                        asset = %asset,
                        height = record.height,
                        end = range.end,
                        "Found unspent record"
                    );
                    return Ok(record);
                }
                Ok(None) => {
                    debug!(asset = %asset, attempt, "No unspent record in window yet");
                }
                Err(e) => {
                    warn!(asset = %asset, attempt, error = %e, "Record lookup failed");
                    last_err = Some(e.into());
                }
            }

            if attempt < attempts {
                sleep(self.config.retry_delay).await;
            }
        }

        Err(last_err.unwrap_or(VaultError::RecordNotFound { attempts }))
    }
}

fn validate(range: HeightRange) -> Result<(), VaultError> {
    if range.start >= range.end {
        return Err(VaultError::InvalidSearchRange {
            start: range.start,
            end: range.end,
        });
    }
    Ok(())
}
