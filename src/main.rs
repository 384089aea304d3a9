//! Vault engine daemon
//!
//! Wires the engine together and runs the reconciliation watcher until
//! interrupted. The chain collaborators are the mock implementations; a
//! real signer and node client plug in behind the same traits.

use std::sync::Arc;

use tracing::{info, warn};

use vault_engine::chain::mock::{MockExecutor, MockLookup};
use vault_engine::{
    AppConfig, ChainLookup, CursorStore, Database, DispatchQueue, FeeSchedule, LocatorConfig,
    MemoryCursorStore, MemoryLedger, PgCursorStore, PgLedger, ReconciliationWatcher,
    RecordLocator, TransferExecutor, TransferLedger, VaultService, WatcherConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("VAULT_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = AppConfig::load_or_default(&env);
    let _guard = vault_engine::logging::init_logging(&config);

    info!(env = %env, "Starting vault engine");

    let engine = config.engine.clone().normalized();

    let (ledger, cursors): (Arc<dyn TransferLedger>, Arc<dyn CursorStore>) =
        match &config.postgres_url {
            Some(url) => {
                let db = Database::connect(url).await?;
                db.health_check().await?;
                (
                    Arc::new(PgLedger::new(db.pool().clone())),
                    Arc::new(PgCursorStore::new(db.pool().clone())),
                )
            }
            None => {
                warn!("postgres_url not set, using in-memory stores");
                (
                    Arc::new(MemoryLedger::new()),
                    Arc::new(MemoryCursorStore::new()),
                )
            }
        };

    let executor: Arc<dyn TransferExecutor> = Arc::new(MockExecutor::new());
    let lookup: Arc<dyn ChainLookup> = Arc::new(MockLookup::new(1_000));

    let locator = Arc::new(RecordLocator::new(
        lookup,
        cursors,
        LocatorConfig {
            window: engine.record_window,
            fixed_range: engine
                .fixed_range()
                .map(|(start, end)| vault_engine::HeightRange::new(start, end)),
            retry_attempts: engine.record_retry_attempts,
            retry_delay: engine.record_retry_delay(),
        },
    ));

    let service = Arc::new(VaultService::new(
        Arc::clone(&ledger),
        executor,
        locator,
        DispatchQueue::new(engine.dispatch_concurrency),
        FeeSchedule {
            native: engine.native_fee,
            stablecoin: engine.stablecoin_fee,
        },
        engine.explorer_base_url.clone(),
    ));

    let watcher = ReconciliationWatcher::new(
        service,
        ledger,
        WatcherConfig {
            poll_interval: engine.poll_interval(),
            batch_size: engine.batch_size,
        },
    );
    tokio::spawn(async move { watcher.run().await });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
