//! Per-network gas sampling with cascading priority-fee fallback.

use std::sync::Arc;

use chrono::Utc;
use feewatch_chain::FeeSource;
use tracing::{debug, warn};

use crate::network::{FeePolicy, NetworkKey};
use crate::store::{GasSampleUpdate, GasStore, HistoryPoint};

const WEI_PER_GWEI: f64 = 1e9;

/// Samples one network's fee parameters into the shared store.
///
/// All fetch failures are recovered locally: the tick becomes a no-op and
/// the previous sample stays in place. Nothing here returns an error to
/// the scheduling loops.
pub struct GasSampler {
    network: NetworkKey,
    policy: FeePolicy,
    source: Arc<dyn FeeSource>,
    store: Arc<GasStore>,
}

impl GasSampler {
    pub fn new(network: NetworkKey, source: Arc<dyn FeeSource>, store: Arc<GasStore>) -> Self {
        Self {
            network,
            policy: network.fee_policy(),
            source,
            store,
        }
    }

    /// One fee-poll tick: read the latest header, resolve the priority
    /// fee through the cascade, and merge exactly one sample.
    pub async fn sample_once(&self) {
        let header = match self.source.latest_header().await {
            Ok(Some(header)) => header,
            Ok(None) => {
                debug!(network = %self.network, "No latest header, keeping previous sample");
                return;
            }
            Err(e) => {
                warn!(network = %self.network, error = %e, "Header fetch failed");
                return;
            }
        };

        // No base-fee field means a pre-fee-market block; nothing to write.
        let Some(base_fee_wei) = header.base_fee_per_gas else {
            debug!(
                network = %self.network,
                block = header.number,
                "Header carries no base fee, skipping tick"
            );
            return;
        };
        let base_fee = base_fee_wei as f64 / WEI_PER_GWEI;

        let suggested = match self.source.suggested_priority_fee().await {
            Ok(wei) => Some(wei),
            Err(e) => {
                debug!(network = %self.network, error = %e, "Priority fee RPC failed, trying fee history");
                None
            }
        };

        // Second tier only runs when the first came up empty.
        let p50_reward = if suggested.is_none() {
            match self.source.fee_history_p50().await {
                Ok(reward) => reward,
                Err(e) => {
                    debug!(network = %self.network, error = %e, "Fee history failed, using policy default");
                    None
                }
            }
        } else {
            None
        };

        let priority_fee = resolve_priority_fee(suggested, p50_reward, &self.policy);

        self.store.merge_chain_data(
            self.network,
            GasSampleUpdate {
                base_fee: Some(base_fee),
                priority_fee: Some(priority_fee),
            },
        );

        debug!(
            network = %self.network,
            block = header.number,
            base_fee,
            priority_fee,
            "Gas sample updated"
        );
    }

    /// One history tick: append a coarse trend point when a header with a
    /// base fee is available, otherwise skip silently.
    pub async fn record_history_point(&self) {
        let header = match self.source.latest_header().await {
            Ok(Some(header)) => header,
            Ok(None) => return,
            Err(e) => {
                warn!(network = %self.network, error = %e, "History header fetch failed");
                return;
            }
        };

        let Some(base_fee_wei) = header.base_fee_per_gas else {
            return;
        };

        let point = HistoryPoint {
            timestamp: Utc::now(),
            base_fee: base_fee_wei as f64 / WEI_PER_GWEI,
            priority_fee: self.policy.history_priority_fee_gwei,
        };

        debug!(
            network = %self.network,
            base_fee = point.base_fee,
            "History point recorded"
        );
        self.store.append_history(self.network, point);
    }
}

/// Pick a priority fee from the cascade results, in Gwei.
///
/// Tier 1: suggested fee RPC. Tier 2: 50th-percentile fee-history reward.
/// Tier 3: the network's policy default, which never fails.
fn resolve_priority_fee(
    suggested_wei: Option<u128>,
    p50_reward_wei: Option<u128>,
    policy: &FeePolicy,
) -> f64 {
    if let Some(wei) = suggested_wei {
        return wei as f64 / WEI_PER_GWEI;
    }
    if let Some(wei) = p50_reward_wei {
        return wei as f64 / WEI_PER_GWEI;
    }
    policy.default_priority_fee_gwei
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use feewatch_chain::HeaderInfo;

    struct StubSource {
        header: Result<Option<HeaderInfo>, ()>,
        suggested: Option<u128>,
        p50: Option<u128>,
    }

    impl StubSource {
        fn with_header(base_fee_per_gas: Option<u128>) -> Self {
            Self {
                header: Ok(Some(HeaderInfo {
                    number: 19_000_000,
                    base_fee_per_gas,
                })),
                suggested: None,
                p50: None,
            }
        }
    }

    #[async_trait]
    impl FeeSource for StubSource {
        async fn latest_header(&self) -> Result<Option<HeaderInfo>> {
            match &self.header {
                Ok(header) => Ok(*header),
                Err(()) => Err(anyhow!("rpc timeout")),
            }
        }

        async fn suggested_priority_fee(&self) -> Result<u128> {
            self.suggested.ok_or_else(|| anyhow!("method not supported"))
        }

        async fn fee_history_p50(&self) -> Result<Option<u128>> {
            Ok(self.p50)
        }
    }

    #[test]
    fn test_cascade_tier_order() {
        let policy = NetworkKey::Ethereum.fee_policy();

        // Tier 1 wins when present.
        assert_eq!(
            resolve_priority_fee(Some(2_000_000_000), Some(9_000_000_000), &policy),
            2.0
        );
        // Tier 2 when tier 1 failed.
        assert_eq!(resolve_priority_fee(None, Some(3_500_000_000), &policy), 3.5);
        // Tier 3 never fails.
        assert_eq!(resolve_priority_fee(None, None, &policy), 1.5);
    }

    #[test]
    fn test_cascade_per_network_defaults() {
        assert_eq!(
            resolve_priority_fee(None, None, &NetworkKey::Polygon.fee_policy()),
            30.0
        );
        assert_eq!(
            resolve_priority_fee(None, None, &NetworkKey::Arbitrum.fee_policy()),
            0.1
        );
    }

    #[tokio::test]
    async fn test_sample_writes_tier3_default() {
        let store = Arc::new(GasStore::new());
        let source = Arc::new(StubSource::with_header(Some(30_000_000_000)));
        let sampler = GasSampler::new(NetworkKey::Ethereum, source, store.clone());

        sampler.sample_once().await;

        let latest = store.latest(NetworkKey::Ethereum);
        assert_eq!(latest.base_fee, 30.0);
        assert_eq!(latest.priority_fee, 1.5);
    }

    #[tokio::test]
    async fn test_sample_prefers_suggested_fee() {
        let store = Arc::new(GasStore::new());
        let mut stub = StubSource::with_header(Some(30_000_000_000));
        stub.suggested = Some(2_500_000_000);
        stub.p50 = Some(9_000_000_000);
        let sampler = GasSampler::new(NetworkKey::Ethereum, Arc::new(stub), store.clone());

        sampler.sample_once().await;
        assert_eq!(store.latest(NetworkKey::Ethereum).priority_fee, 2.5);
    }

    #[tokio::test]
    async fn test_missing_header_keeps_previous_sample() {
        let store = Arc::new(GasStore::new());
        store.merge_chain_data(
            NetworkKey::Ethereum,
            GasSampleUpdate {
                base_fee: Some(10.0),
                priority_fee: Some(2.0),
            },
        );

        let stub = StubSource {
            header: Ok(None),
            suggested: None,
            p50: None,
        };
        let sampler = GasSampler::new(NetworkKey::Ethereum, Arc::new(stub), store.clone());
        sampler.sample_once().await;

        let latest = store.latest(NetworkKey::Ethereum);
        assert_eq!(latest.base_fee, 10.0);
        assert_eq!(latest.priority_fee, 2.0);
    }

    #[tokio::test]
    async fn test_header_without_base_fee_aborts_tick() {
        let store = Arc::new(GasStore::new());
        let source = Arc::new(StubSource::with_header(None));
        let sampler = GasSampler::new(NetworkKey::Ethereum, source, store.clone());

        sampler.sample_once().await;
        assert!(!store.latest(NetworkKey::Ethereum).has_data());
    }

    #[tokio::test]
    async fn test_fetch_error_is_swallowed() {
        let store = Arc::new(GasStore::new());
        let stub = StubSource {
            header: Err(()),
            suggested: None,
            p50: None,
        };
        let sampler = GasSampler::new(NetworkKey::Polygon, Arc::new(stub), store.clone());

        sampler.sample_once().await;
        sampler.record_history_point().await;

        assert!(!store.latest(NetworkKey::Polygon).has_data());
        assert!(store
            .snapshot()
            .chain(NetworkKey::Polygon)
            .unwrap()
            .history
            .is_empty());
    }

    #[tokio::test]
    async fn test_history_point_uses_nominal_priority() {
        let store = Arc::new(GasStore::new());
        let source = Arc::new(StubSource::with_header(Some(40_000_000_000)));
        let sampler = GasSampler::new(NetworkKey::Polygon, source, store.clone());

        sampler.record_history_point().await;

        let snap = store.snapshot();
        let history = &snap.chain(NetworkKey::Polygon).unwrap().history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].base_fee, 40.0);
        // History skips the cascade and records the nominal default.
        assert_eq!(history[0].priority_fee, 2.0);
    }
}
