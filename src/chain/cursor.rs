//! Resume Cursor Persistence
//!
//! One integer per asset: the block height a previous successful search
//! already covered. Written only after a hit; concurrent writers are fine,
//! last writer wins. The cursor is a latency aid, not a correctness
//! requirement.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::vault::error::VaultError;
use crate::vault::types::VaultAsset;

#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn get(&self, asset: VaultAsset) -> Result<Option<u64>, VaultError>;
    async fn set(&self, asset: VaultAsset, height: u64) -> Result<(), VaultError>;
}

/// Cursor persisted in the `search_cursor_tb` table, keyed by asset
pub struct PgCursorStore {
    pool: PgPool,
}

impl PgCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorStore for PgCursorStore {
    async fn get(&self, asset: VaultAsset) -> Result<Option<u64>, VaultError> {
        let row = sqlx::query(
            "SELECT last_covered_height FROM search_cursor_tb WHERE asset = $1",
        )
        .bind(asset.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i64, _>("last_covered_height") as u64))
    }

    async fn set(&self, asset: VaultAsset, height: u64) -> Result<(), VaultError> {
        sqlx::query(
            r#"
            INSERT INTO search_cursor_tb (asset, last_covered_height)
            VALUES ($1, $2)
            ON CONFLICT (asset) DO UPDATE
            SET last_covered_height = EXCLUDED.last_covered_height,
                updated_at = NOW()
            "#,
        )
        .bind(asset.as_str())
        .bind(height as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory cursor store for tests and database-less runs
#[derive(Default)]
pub struct MemoryCursorStore {
    heights: Mutex<HashMap<VaultAsset, u64>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn get(&self, asset: VaultAsset) -> Result<Option<u64>, VaultError> {
        Ok(self.heights.lock().unwrap().get(&asset).copied())
    }

    async fn set(&self, asset: VaultAsset, height: u64) -> Result<(), VaultError> {
        self.heights.lock().unwrap().insert(asset, height);
        Ok(())
    }
}
