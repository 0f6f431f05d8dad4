//! Shared gas and price state.
//!
//! `GasStore` is the single serialization point between the samplers, the
//! two price-oracle channels, and consumers. Every mutation is one atomic
//! operation under the relevant lock; nothing is held across an await.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::network::NetworkKey;

/// Maximum history points retained per network.
/// ~25 hours at 15-minute intervals.
pub const HISTORY_CAP: usize = 100;

/// Most recent fee pair for one network, in Gwei.
///
/// A zero base fee means "no data observed yet", not a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GasSample {
    pub base_fee: f64,
    pub priority_fee: f64,
}

impl GasSample {
    /// Whether a real sample has been observed.
    pub fn has_data(&self) -> bool {
        self.base_fee > 0.0
    }
}

/// Partial update merged onto a network's latest sample.
/// Absent fields retain their prior values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasSampleUpdate {
    pub base_fee: Option<f64>,
    pub priority_fee: Option<f64>,
}

/// One coarse-interval fee observation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub base_fee: f64,
    pub priority_fee: f64,
}

/// Per-network state owned exclusively by the store.
#[derive(Debug, Default)]
struct ChainState {
    latest: GasSample,
    history: VecDeque<HistoryPoint>,
}

/// Read-only copy of one network's state.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub latest: GasSample,
    pub history: Vec<HistoryPoint>,
}

/// Read-only view of the whole store, taken at one point in time per
/// network. Networks are independent; no cross-network atomicity is
/// promised.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub chains: Vec<(NetworkKey, ChainSnapshot)>,
    /// `0.0` until the oracle has derived or seeded a price.
    pub eth_usd_price: f64,
}

impl Snapshot {
    /// Look up one network's snapshot.
    pub fn chain(&self, network: NetworkKey) -> Option<&ChainSnapshot> {
        self.chains
            .iter()
            .find(|(key, _)| *key == network)
            .map(|(_, state)| state)
    }
}

/// Concurrency-safe store for all chains' fee data and the ETH/USD
/// reference price.
pub struct GasStore {
    chains: DashMap<NetworkKey, ChainState>,
    eth_usd: RwLock<f64>,
}

impl GasStore {
    /// Create a store with sentinel state for every tracked network.
    pub fn new() -> Self {
        let chains = DashMap::new();
        for network in NetworkKey::ALL {
            chains.insert(network, ChainState::default());
        }

        Self {
            chains,
            eth_usd: RwLock::new(0.0),
        }
    }

    /// Merge a partial sample onto a network's latest values.
    ///
    /// The whole merge happens under the network's entry lock, so readers
    /// never observe a half-applied update.
    pub fn merge_chain_data(&self, network: NetworkKey, update: GasSampleUpdate) {
        let mut entry = self.chains.entry(network).or_default();
        if let Some(base_fee) = update.base_fee {
            entry.latest.base_fee = base_fee;
        }
        if let Some(priority_fee) = update.priority_fee {
            entry.latest.priority_fee = priority_fee;
        }
    }

    /// Append a history point, evicting the oldest past [`HISTORY_CAP`].
    pub fn append_history(&self, network: NetworkKey, point: HistoryPoint) {
        let mut entry = self.chains.entry(network).or_default();
        entry.history.push_back(point);
        while entry.history.len() > HISTORY_CAP {
            entry.history.pop_front();
        }
    }

    /// Overwrite the ETH/USD reference price.
    ///
    /// Both oracle channels write here with last-write-wins semantics;
    /// no cross-channel ordering is enforced.
    pub fn set_price(&self, price: f64) {
        *self.eth_usd.write() = price;
        debug!(price, "ETH/USD price updated");
    }

    /// Current ETH/USD price, `0.0` while unknown.
    pub fn eth_usd_price(&self) -> f64 {
        *self.eth_usd.read()
    }

    /// Latest sample for one network.
    pub fn latest(&self, network: NetworkKey) -> GasSample {
        self.chains
            .get(&network)
            .map(|entry| entry.latest)
            .unwrap_or_default()
    }

    /// Take a consistent read-only view of every network plus the price.
    pub fn snapshot(&self) -> Snapshot {
        let chains = NetworkKey::ALL
            .iter()
            .map(|&network| {
                let state = self
                    .chains
                    .get(&network)
                    .map(|entry| ChainSnapshot {
                        latest: entry.latest,
                        history: entry.history.iter().cloned().collect(),
                    })
                    .unwrap_or_else(|| ChainSnapshot {
                        latest: GasSample::default(),
                        history: Vec::new(),
                    });
                (network, state)
            })
            .collect();

        Snapshot {
            chains,
            eth_usd_price: self.eth_usd_price(),
        }
    }
}

impl Default for GasStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(secs: i64) -> HistoryPoint {
        HistoryPoint {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            base_fee: secs as f64,
            priority_fee: 2.0,
        }
    }

    #[test]
    fn test_merge_retains_unspecified_fields() {
        let store = GasStore::new();
        store.merge_chain_data(
            NetworkKey::Ethereum,
            GasSampleUpdate {
                base_fee: Some(10.0),
                priority_fee: Some(2.0),
            },
        );
        store.merge_chain_data(
            NetworkKey::Ethereum,
            GasSampleUpdate {
                base_fee: None,
                priority_fee: Some(5.0),
            },
        );

        let latest = store.latest(NetworkKey::Ethereum);
        assert_eq!(latest.base_fee, 10.0);
        assert_eq!(latest.priority_fee, 5.0);
    }

    #[test]
    fn test_networks_are_independent() {
        let store = GasStore::new();
        store.merge_chain_data(
            NetworkKey::Polygon,
            GasSampleUpdate {
                base_fee: Some(80.0),
                priority_fee: Some(30.0),
            },
        );

        assert!(!store.latest(NetworkKey::Ethereum).has_data());
        assert!(store.latest(NetworkKey::Polygon).has_data());
    }

    #[test]
    fn test_history_fifo_eviction() {
        let store = GasStore::new();
        for i in 0..101 {
            store.append_history(NetworkKey::Ethereum, point(i));
        }

        let snap = store.snapshot();
        let history = &snap.chain(NetworkKey::Ethereum).unwrap().history;
        assert_eq!(history.len(), HISTORY_CAP);
        // The very first point was evicted; order is preserved.
        assert_eq!(history[0], point(1));
        assert_eq!(history[99], point(100));
        for window in history.windows(2) {
            assert!(window[0].timestamp < window[1].timestamp);
        }
    }

    #[test]
    fn test_price_sentinel_and_overwrite() {
        let store = GasStore::new();
        assert_eq!(store.eth_usd_price(), 0.0);

        store.set_price(2345.6);
        assert_eq!(store.eth_usd_price(), 2345.6);

        // Last write wins, even if "older".
        store.set_price(2000.0);
        assert_eq!(store.eth_usd_price(), 2000.0);
    }

    #[test]
    fn test_snapshot_covers_all_networks() {
        let store = GasStore::new();
        let snap = store.snapshot();
        assert_eq!(snap.chains.len(), NetworkKey::ALL.len());
        assert_eq!(snap.eth_usd_price, 0.0);
        for (_, chain) in &snap.chains {
            assert!(!chain.latest.has_data());
            assert!(chain.history.is_empty());
        }
    }

    #[test]
    fn test_snapshot_serializes() {
        let store = GasStore::new();
        store.merge_chain_data(
            NetworkKey::Ethereum,
            GasSampleUpdate {
                base_fee: Some(12.5),
                priority_fee: Some(1.5),
            },
        );
        store.set_price(2000.0);

        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(json["eth_usd_price"], 2000.0);
    }
}
