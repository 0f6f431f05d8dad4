//! Engine configuration with TOML and environment support.

use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::network::NetworkKey;

/// Uniswap V3 ETH/USDC 0.05% pool on Ethereum mainnet.
const DEFAULT_POOL_ADDRESS: &str = "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640";

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// WebSocket endpoints, one per tracked network.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<NetworkEndpoint>,

    /// Reference pool settings for the price oracle.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Timer periods.
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            pool: PoolConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from TOML content.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse engine config: {}", e))
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build from defaults plus `FEEWATCH_<NETWORK>_WS_URL` overrides.
    /// Default endpoints use `ALCHEMY_API_KEY` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for endpoint in &mut config.endpoints {
            let var = format!(
                "FEEWATCH_{}_WS_URL",
                endpoint.network.name().to_uppercase()
            );
            if let Ok(url) = std::env::var(&var) {
                endpoint.ws_url = url;
            }
        }
        config
    }

    /// Endpoint for one network, if configured.
    pub fn endpoint(&self, network: NetworkKey) -> Option<&NetworkEndpoint> {
        self.endpoints.iter().find(|e| e.network == network)
    }
}

/// One network's RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    pub network: NetworkKey,
    pub ws_url: String,
}

fn default_endpoints() -> Vec<NetworkEndpoint> {
    let key = std::env::var("ALCHEMY_API_KEY").unwrap_or_else(|_| "demo".to_string());

    vec![
        NetworkEndpoint {
            network: NetworkKey::Ethereum,
            ws_url: format!("wss://eth-mainnet.g.alchemy.com/v2/{key}"),
        },
        NetworkEndpoint {
            network: NetworkKey::Polygon,
            ws_url: format!("wss://polygon-mainnet.g.alchemy.com/v2/{key}"),
        },
        NetworkEndpoint {
            network: NetworkKey::Arbitrum,
            ws_url: format!("wss://arb-mainnet.g.alchemy.com/v2/{key}"),
        },
    ]
}

/// Reference pool for the ETH/USD derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool contract address on the primary network.
    #[serde(default = "default_pool_address")]
    pub address: String,

    /// How many blocks the periodic scan looks back for swap logs.
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
}

fn default_pool_address() -> String {
    DEFAULT_POOL_ADDRESS.to_string()
}

fn default_lookback_blocks() -> u64 {
    100
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            address: default_pool_address(),
            lookback_blocks: default_lookback_blocks(),
        }
    }
}

impl PoolConfig {
    /// Parse the pool address.
    pub fn pool_address(&self) -> Result<Address> {
        self.address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid pool address '{}': {}", self.address, e))
    }
}

/// Timer periods for the engine's loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Fee poll period per network.
    #[serde(default = "default_fee_poll_secs")]
    pub fee_poll_secs: u64,

    /// History snapshot period per network.
    #[serde(default = "default_history_secs")]
    pub history_secs: u64,

    /// Price log-scan period.
    #[serde(default = "default_price_scan_secs")]
    pub price_scan_secs: u64,

    /// Delay before re-dialing after a dropped swap subscription.
    #[serde(default = "default_resubscribe_delay_secs")]
    pub resubscribe_delay_secs: u64,
}

fn default_fee_poll_secs() -> u64 {
    6
}
fn default_history_secs() -> u64 {
    900
}
fn default_price_scan_secs() -> u64 {
    30
}
fn default_resubscribe_delay_secs() -> u64 {
    5
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fee_poll_secs: default_fee_poll_secs(),
            history_secs: default_history_secs(),
            price_scan_secs: default_price_scan_secs(),
            resubscribe_delay_secs: default_resubscribe_delay_secs(),
        }
    }
}

impl TimingConfig {
    pub fn fee_poll(&self) -> Duration {
        Duration::from_secs(self.fee_poll_secs)
    }

    pub fn history(&self) -> Duration {
        Duration::from_secs(self.history_secs)
    }

    pub fn price_scan(&self) -> Duration {
        Duration::from_secs(self.price_scan_secs)
    }

    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_secs(self.resubscribe_delay_secs)
    }
}
