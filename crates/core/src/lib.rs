//! Feewatch core engine.
//!
//! This crate provides the multi-chain gas and price oracle:
//! - Shared concurrency-safe store of fee samples, bounded history, and
//!   the ETH/USD reference price
//! - Per-network gas samplers with a cascading priority-fee fallback
//! - Dual-channel price oracle (swap-event subscription + periodic log scan)
//! - Engine lifecycle owning every timer and subscription as one unit
//! - Transaction cost estimation for simulation consumers
//!
//! The engine's only observable failure mode is stale or sentinel data;
//! no fetch error propagates past the sampler/oracle boundary.

mod config;
mod engine;
mod estimate;
mod network;
mod oracle;
mod price;
mod sampler;
mod store;

pub use config::{EngineConfig, NetworkEndpoint, PoolConfig, TimingConfig};
pub use engine::Engine;
pub use estimate::{estimate_cost_usd, TransactionEstimate, DEFAULT_TRANSFER_GAS};
pub use network::{FeePolicy, NetworkKey};
pub use oracle::PriceOracle;
pub use price::{price_from_sqrt_x96, FALLBACK_ETH_USD, PRICE_BAND_MAX, PRICE_BAND_MIN};
pub use sampler::GasSampler;
pub use store::{
    ChainSnapshot, GasSample, GasSampleUpdate, GasStore, HistoryPoint, Snapshot, HISTORY_CAP,
};
