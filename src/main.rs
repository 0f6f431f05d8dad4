//! Feewatch
//!
//! Multi-chain gas price and ETH/USD reference price oracle.
//! Samples base and priority fees from Ethereum, Polygon, and Arbitrum,
//! derives ETH/USD from Uniswap V3 pool state, and serves consistent
//! in-memory snapshots to consumers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feewatch_core::{Engine, EngineConfig, GasStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,feewatch_core=debug,feewatch_chain=debug")),
        )
        .init();

    let config = match std::env::var("FEEWATCH_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading config file");
            EngineConfig::from_file(&path)?
        }
        Err(_) => EngineConfig::from_env(),
    };

    info!(networks = config.endpoints.len(), "Starting feewatch");

    let store = Arc::new(GasStore::new());
    let engine = Engine::new(config, store.clone());
    engine.start().await?;

    // Headless status consumer; the snapshot interface is what any UI
    // layer would poll.
    let status = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snap = store.snapshot();
            for (network, chain) in &snap.chains {
                info!(
                    network = %network,
                    base_fee = chain.latest.base_fee,
                    priority_fee = chain.latest.priority_fee,
                    history_points = chain.history.len(),
                    "Chain status"
                );
            }
            info!(eth_usd = snap.eth_usd_price, "Oracle status");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    status.abort();
    engine.stop().await;

    Ok(())
}
