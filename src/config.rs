//! Application configuration
//!
//! Loaded from `config/{env}.yaml`; every engine knob has a default so a
//! missing file or section still yields a runnable configuration.

use std::fs;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Shared transaction ledger; in-memory stores are used when unset
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "vault_engine.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            postgres_url: None,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }

    /// Load `config/{env}.yaml`, or fall back to defaults when absent
    pub fn load_or_default(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        match fs::read_to_string(&config_path) {
            Ok(content) => serde_yaml::from_str(&content).expect("Failed to parse config yaml"),
            Err(_) => Self::default(),
        }
    }
}

/// Engine knobs, clamped to the supported bounds by [`EngineConfig::normalized`]
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Max payouts running at once (min 1)
    pub dispatch_concurrency: usize,
    /// Watcher sweep interval (floor 15000)
    pub poll_interval_ms: u64,
    /// Rows per watcher sweep (1..=50)
    pub batch_size: u32,
    /// Trailing record-search window in blocks
    pub record_window: u64,
    /// Operator override for the search range
    pub fixed_range_start: Option<u64>,
    pub fixed_range_end: Option<u64>,
    /// Record lookup attempts and the fixed delay between them
    pub record_retry_attempts: u32,
    pub record_retry_delay_ms: u64,
    /// Per-asset network fees, asset-native units
    pub native_fee: Decimal,
    pub stablecoin_fee: Decimal,
    /// Base URL for vault explorer references on completed rows
    pub explorer_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_concurrency: 1,
            poll_interval_ms: 60_000,
            batch_size: 10,
            record_window: 50,
            fixed_range_start: None,
            fixed_range_end: None,
            record_retry_attempts: 3,
            record_retry_delay_ms: 2_000,
            native_fee: Decimal::ZERO,
            stablecoin_fee: Decimal::ZERO,
            explorer_base_url: "https://explorer.example.org/transaction".to_string(),
        }
    }
}

impl EngineConfig {
    pub const MIN_POLL_INTERVAL_MS: u64 = 15_000;
    pub const MAX_BATCH_SIZE: u32 = 50;

    /// Clamp out-of-range knobs instead of rejecting the config
    pub fn normalized(mut self) -> Self {
        self.dispatch_concurrency = self.dispatch_concurrency.max(1);
        self.poll_interval_ms = self.poll_interval_ms.max(Self::MIN_POLL_INTERVAL_MS);
        self.batch_size = self.batch_size.clamp(1, Self::MAX_BATCH_SIZE);
        self.record_retry_attempts = self.record_retry_attempts.max(1);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn record_retry_delay(&self) -> Duration {
        Duration::from_millis(self.record_retry_delay_ms)
    }

    /// Both ends set, or no override; a half-set range is ignored
    pub fn fixed_range(&self) -> Option<(u64, u64)> {
        match (self.fixed_range_start, self.fixed_range_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}
