//! # asb-bot Entry Point
//!
//! Loads and validates the TOML configuration, wires the HTTP
//! transports, and runs the distribution loop until Ctrl+C.
//!
//! ```text
//! asb-bot [config.toml]
//! ```
//!
//! The config path defaults to `config.toml` in the working directory.
//! Any configuration problem is fatal here; nothing past this point is
//! allowed to terminate the process.

use std::env;
use std::sync::Arc;

use tracing::{error, info, Level};

use asb_bot::{BalanceSource, DistributionScheduler, PayoutBatcher, ShutdownToken};
use asb_common::{
    load_from_file, AlgodApi, DispenserAccount, HttpAlgod, HttpIndexer, IndexerApi,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = match load_from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    let dispenser = match DispenserAccount::from_seed_hex(&config.staking.dispenser_seed) {
        Ok(dispenser) => dispenser,
        Err(e) => {
            error!("Dispenser credential error: {}", e);
            std::process::exit(1);
        }
    };

    info!("═══════════════════════════════════════════════════════════════");
    info!("                 ASB Staking Rewards Dispenser                  ");
    info!("═══════════════════════════════════════════════════════════════");
    info!("Config:        {}", path);
    info!("Staking asset: {}", config.staking.asset_id);
    info!(
        "Interval:      {}s (offset {}s)",
        config.staking.interval_secs, config.staking.offset_secs
    );
    info!("Pools:         {}", config.staking.effective_pools().len());
    info!("Dispenser:     {}", dispenser.address());
    info!("Indexer:       {}", config.indexer.host);
    info!("Node:          {}", config.algod.host);
    info!("Page size:     {}", config.staking.payout_page_size);
    info!("═══════════════════════════════════════════════════════════════");

    let shutdown = ShutdownToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested..."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
            shutdown.request();
        });
    }

    let indexer: Arc<dyn IndexerApi> = Arc::new(HttpIndexer::from_config(&config.indexer));
    let algod: Arc<dyn AlgodApi> = Arc::new(HttpAlgod::from_config(&config.algod));

    let source = BalanceSource::new(indexer, config.indexer.delay_ms, shutdown.clone());
    let batcher = PayoutBatcher::new(
        algod.clone(),
        dispenser,
        config.staking.asset_id,
        config.staking.payout_page_size,
    );
    let mut scheduler =
        DistributionScheduler::new(&config.staking, source, batcher, algod, shutdown);

    info!("🚀 Distribution loop running. Press Ctrl+C to stop.");
    scheduler.run().await;

    info!("═══════════════════════════════════════════════════════════════");
    info!("                     Bot stopped cleanly                        ");
    info!("═══════════════════════════════════════════════════════════════");
}
