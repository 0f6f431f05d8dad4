//! Connection management for persistent WebSocket providers.
//! Uses Alloy providers for type-safe RPC interactions.

use std::sync::Arc;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, RootProvider, WsConnect};
use alloy::pubsub::Subscription;
use alloy::rpc::types::{Filter, Log};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::swap::swap_signatures;

/// Connection establishment failure.
///
/// RPC failures after a connection is up are plain `anyhow` errors;
/// this type only covers the dial itself so callers can isolate a
/// network that never came up.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("websocket connection to {url} failed: {reason}")]
    WebSocket { url: String, reason: String },
}

/// Latest block header fields the samplers care about.
#[derive(Debug, Clone, Copy)]
pub struct HeaderInfo {
    /// Block number.
    pub number: u64,
    /// Protocol base fee in wei. `None` on pre-fee-market blocks and
    /// networks without a base fee.
    pub base_fee_per_gas: Option<u128>,
}

/// Read-only fee data source for one network.
///
/// `ChainConnection` is the production implementation; samplers take the
/// trait so the fallback cascade can be exercised without a live endpoint.
#[async_trait]
pub trait FeeSource: Send + Sync {
    /// Fetch the latest block header, if the node returned one.
    async fn latest_header(&self) -> Result<Option<HeaderInfo>>;

    /// `eth_maxPriorityFeePerGas`, in wei.
    async fn suggested_priority_fee(&self) -> Result<u128>;

    /// 50th-percentile priority reward of the most recent block via
    /// `eth_feeHistory`, in wei. `Ok(None)` when the node returned no
    /// reward data.
    async fn fee_history_p50(&self) -> Result<Option<u128>>;
}

/// One persistent WebSocket connection to a network's RPC endpoint.
///
/// The provider is held for the lifetime of the connection so pubsub
/// subscriptions stay alive. `reconnect` re-dials the same endpoint and
/// swaps the provider in place; clones observe the fresh provider.
#[derive(Clone)]
pub struct ChainConnection {
    /// Network label for logging.
    label: String,
    /// WebSocket URL this connection dials.
    ws_url: String,
    /// Live provider. Swapped wholesale on reconnect; never held across
    /// an await.
    provider: Arc<RwLock<RootProvider>>,
}

impl std::fmt::Debug for ChainConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConnection")
            .field("label", &self.label)
            .field("ws_url", &self.ws_url)
            .finish()
    }
}

impl ChainConnection {
    /// Dial the endpoint and wrap the resulting provider.
    pub async fn connect(label: impl Into<String>, ws_url: &str) -> Result<Self, ConnectError> {
        let label = label.into();
        let provider = Self::dial(ws_url).await?;

        info!(network = %label, ws_url, "WebSocket connected");

        Ok(Self {
            label,
            ws_url: ws_url.to_string(),
            provider: Arc::new(RwLock::new(provider)),
        })
    }

    async fn dial(ws_url: &str) -> Result<RootProvider, ConnectError> {
        let ws = WsConnect::new(ws_url);
        let provider = ProviderBuilder::new()
            .on_ws(ws)
            .await
            .map_err(|e| ConnectError::WebSocket {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(provider.root().clone())
    }

    /// Get the network label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get the WebSocket URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Clone out the current provider. The lock is never held across an
    /// await; RootProvider clones share the underlying pubsub service.
    fn provider(&self) -> RootProvider {
        self.provider.read().clone()
    }

    /// Re-dial the endpoint and replace the provider.
    pub async fn reconnect(&self) -> Result<(), ConnectError> {
        let fresh = Self::dial(&self.ws_url).await?;
        *self.provider.write() = fresh;
        info!(network = %self.label, "WebSocket reconnected");
        Ok(())
    }

    /// Get current block number.
    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.provider().get_block_number().await?)
    }

    /// Query historical Swap logs for a pool from `from_block` to the tip.
    pub async fn swap_logs(&self, pool: Address, from_block: u64) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(pool)
            .event_signature(swap_signatures::SWAP)
            .from_block(from_block)
            .to_block(BlockNumberOrTag::Latest);

        let logs = self.provider().get_logs(&filter).await?;
        debug!(network = %self.label, pool = %pool, count = logs.len(), "Fetched swap logs");
        Ok(logs)
    }

    /// Subscribe to live Swap logs for a pool.
    ///
    /// The subscription stays alive as long as this connection's provider
    /// does; callers re-subscribe when the stream ends.
    pub async fn subscribe_swap_logs(&self, pool: Address) -> Result<Subscription<Log>> {
        let filter = Filter::new()
            .address(pool)
            .event_signature(swap_signatures::SWAP);

        let sub = self.provider().subscribe_logs(&filter).await?;
        info!(network = %self.label, pool = %pool, "Subscribed to swap events");
        Ok(sub)
    }
}

#[async_trait]
impl FeeSource for ChainConnection {
    async fn latest_header(&self) -> Result<Option<HeaderInfo>> {
        let block = self
            .provider()
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?;

        Ok(block.map(|b| HeaderInfo {
            number: b.header.number,
            base_fee_per_gas: b.header.base_fee_per_gas.map(|f| f as u128),
        }))
    }

    async fn suggested_priority_fee(&self) -> Result<u128> {
        Ok(self.provider().get_max_priority_fee_per_gas().await?)
    }

    async fn fee_history_p50(&self) -> Result<Option<u128>> {
        let history = self
            .provider()
            .get_fee_history(1, BlockNumberOrTag::Latest, &[50.0])
            .await?;

        Ok(history
            .reward
            .as_ref()
            .and_then(|blocks| blocks.first())
            .and_then(|rewards| rewards.first())
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_is_isolated_error() {
        // Nothing listens on this port; the dial must fail cleanly with
        // a ConnectError rather than panic or hang.
        let result = ChainConnection::connect("ethereum", "ws://127.0.0.1:9").await;
        assert!(matches!(result, Err(ConnectError::WebSocket { .. })));
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_connect_live() {
        let conn = ChainConnection::connect("ethereum", "wss://eth-mainnet.g.alchemy.com/v2/demo")
            .await
            .unwrap();
        let block = conn.block_number().await.unwrap();
        assert!(block > 0);
    }
}
