//! ETH/USD price oracle over a Uniswap V3 pool.
//!
//! Two channels keep the store price fresh: a live Swap-event
//! subscription and a periodic log scan. Both feed the same derivation
//! and the same store field with last-write-wins semantics; a slow scan
//! result may overwrite a fresher event-driven one, which is accepted for
//! simplicity.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::rpc::types::Log;
use feewatch_chain::{parse_swap_log, ChainConnection};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::price::{price_from_sqrt_x96, FALLBACK_ETH_USD};
use crate::store::GasStore;

/// Drives both price-update channels against one pool.
pub struct PriceOracle {
    conn: ChainConnection,
    pool: Address,
    lookback_blocks: u64,
    resubscribe_delay: Duration,
    store: Arc<GasStore>,
}

impl PriceOracle {
    pub fn new(
        conn: ChainConnection,
        pool: Address,
        lookback_blocks: u64,
        resubscribe_delay: Duration,
        store: Arc<GasStore>,
    ) -> Self {
        Self {
            conn,
            pool,
            lookback_blocks,
            resubscribe_delay,
            store,
        }
    }

    /// One periodic scan tick: derive from the most recent swap in the
    /// lookback window, or seed the fallback while the price is still the
    /// unknown sentinel.
    pub async fn scan_once(&self) {
        let tip = match self.conn.block_number().await {
            Ok(number) => number,
            Err(e) => {
                warn!(error = %e, "Block number fetch failed");
                seed_fallback_price(&self.store);
                return;
            }
        };

        let from_block = tip.saturating_sub(self.lookback_blocks);
        match self.conn.swap_logs(self.pool, from_block).await {
            Ok(logs) => match latest_swap_price(&logs) {
                Some(price) => {
                    self.store.set_price(price);
                    debug!(price, scanned = logs.len(), "Price updated from log scan");
                }
                None => {
                    debug!(from_block, "No recent swap events");
                    seed_fallback_price(&self.store);
                }
            },
            Err(e) => {
                warn!(error = %e, "Swap log query failed");
                seed_fallback_price(&self.store);
            }
        }
    }

    /// Event channel: consume live Swap logs until the stream ends, then
    /// re-dial and re-subscribe after a delay. Runs until cancelled.
    pub async fn run_subscription(&self) {
        loop {
            match self.conn.subscribe_swap_logs(self.pool).await {
                Ok(sub) => {
                    let mut stream = sub.into_stream();
                    while let Some(log) = stream.next().await {
                        let Some(obs) = parse_swap_log(&log) else {
                            continue;
                        };
                        let price = price_from_sqrt_x96(obs.sqrt_price_x96);
                        self.store.set_price(price);
                        debug!(price, block = obs.block_number, "Price updated from swap event");
                    }
                    warn!("Swap subscription ended");
                }
                Err(e) => {
                    warn!(error = %e, "Swap subscription failed");
                }
            }

            tokio::time::sleep(self.resubscribe_delay).await;
            if let Err(e) = self.conn.reconnect().await {
                warn!(error = %e, "Reconnect failed, will retry");
            }
        }
    }
}

/// Derive a price from the most recent parseable swap log, if any.
fn latest_swap_price(logs: &[Log]) -> Option<f64> {
    logs.iter()
        .rev()
        .find_map(parse_swap_log)
        .map(|obs| price_from_sqrt_x96(obs.sqrt_price_x96))
}

/// Write the fallback constant while the price is still unknown, so
/// consumers never observe an indefinite sentinel once the oracle runs.
fn seed_fallback_price(store: &GasStore) {
    if store.eth_usd_price() == 0.0 {
        store.set_price(FALLBACK_ETH_USD);
        info!(price = FALLBACK_ETH_USD, "Seeded fallback ETH/USD price");
    }
}
