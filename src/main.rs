#[cfg(test)]
mod tests;

pub mod aggregator;
pub mod chain;
pub mod config;
pub mod conversion;
pub mod events;
pub mod ingestion;
pub mod persistence;
pub mod rate_limit;
pub mod server;

use {
    aggregator::MintAggregator,
    chain::RpcEventSource,
    config::Config,
    ingestion::{IngestionEngine, ProcessedLedger},
    persistence::{FileStore, SnapshotStore},
    rate_limit::RateLimiter,
    server::AppState,
    std::sync::Arc,
    tokio::sync::RwLock,
};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env();

    // Write logs to stderr so stdout stays free for tooling
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // NOTE: Workaround for rustls issue
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Can't set crypto provider to aws_lc_rs");

    log::info!("🚀 Starting MintFlow...");
    log::info!("📊 Configuration:");
    log::info!("   RPC_URL: {}", config.rpc_url);
    log::info!("   Contract: {}", config.contract_address);
    log::info!("   Start block: {}", config.start_block);
    log::info!("   Poll interval: {:?}", config.poll_interval);
    log::info!("   Data dir: {}", config.data_dir.display());
    log::info!("   Port: {}", config.port);

    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::new(config.data_dir.clone())?);

    // Load previous state from persistence (absent snapshots start empty)
    let entries = persistence::load_aggregates(store.as_ref())?;
    let ids = persistence::load_ledger(store.as_ref())?;
    let cursor = persistence::load_cursor(store.as_ref())?;

    // Seed empty snapshot files on first run so the data dir is always servable
    if entries.is_empty() {
        persistence::save_aggregates(store.as_ref(), &[])?;
    }
    if ids.is_empty() {
        persistence::save_ledger(store.as_ref(), &[])?;
    }

    log::info!(
        "Restored {} users, {} processed events, cursor {:?}",
        entries.len(),
        ids.len(),
        cursor
    );

    let aggregates = Arc::new(RwLock::new(MintAggregator::from_entries(entries)));
    let ledger = ProcessedLedger::from_ids(ids);

    log::info!("🔌 Connecting to RPC: {}", config.rpc_url);
    let source = Arc::new(RpcEventSource::connect(&config.rpc_url, config.contract_address).await?);

    let engine = IngestionEngine::new(
        source,
        store,
        aggregates.clone(),
        ledger,
        cursor,
        config.start_block,
    );
    let engine_handle = tokio::spawn(engine.run(config.poll_interval));

    let state = AppState {
        aggregates,
        limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        )),
    };

    log::info!("✅ Ingestion running, starting query service...");

    // Run ingestion and the query service concurrently; either one exiting
    // takes the process down with it.
    tokio::select! {
        result = engine_handle => {
            log::error!("❌ Ingestion task exited: {:?}", result);
        }
        result = server::serve(config.bind_addr(), state) => {
            match result {
                Ok(_) => log::info!("✅ Query service shut down"),
                Err(e) => log::error!("❌ Query service error: {}", e),
            }
        }
    }

    Ok(())
}
