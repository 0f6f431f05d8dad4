//! Transaction cost estimation over store snapshots.

use serde::Serialize;

use crate::network::NetworkKey;
use crate::store::GasSample;

/// Gas units of a plain native transfer.
pub const DEFAULT_TRANSFER_GAS: u64 = 21_000;

/// USD cost of a transaction at the given fee levels.
///
/// `(base + priority) Gwei * gas / 1e9 = ETH`, then ETH * price = USD.
/// Returns `0.0` if any input is non-positive, matching the sentinel
/// convention the store uses for "no data yet".
pub fn estimate_cost_usd(
    base_fee_gwei: f64,
    priority_fee_gwei: f64,
    gas_units: u64,
    eth_usd: f64,
) -> f64 {
    if base_fee_gwei <= 0.0 || priority_fee_gwei <= 0.0 || gas_units == 0 || eth_usd <= 0.0 {
        return 0.0;
    }

    let total_gwei = base_fee_gwei + priority_fee_gwei;
    let gas_cost_eth = total_gwei * gas_units as f64 / 1e9;
    gas_cost_eth * eth_usd
}

/// Fully itemized estimate for one simulated transaction on one network.
///
/// Every value the simulation layer renders is a named field here rather
/// than an ad-hoc bag of numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionEstimate {
    pub network: NetworkKey,
    /// Transferred amount in native units.
    pub amount_eth: f64,
    pub gas_units: u64,
    /// Effective fee per gas (base + priority), Gwei.
    pub max_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    pub gas_cost_eth: f64,
    pub gas_cost_usd: f64,
    pub amount_usd: f64,
    pub total_cost_eth: f64,
    pub total_cost_usd: f64,
    /// Fee as a percentage of the transferred amount's USD value.
    pub fee_share_of_amount_pct: f64,
    /// Whether the sender balance (when known) covers amount plus fees.
    pub affordable: bool,
}

impl TransactionEstimate {
    /// Build an estimate from a network's latest sample.
    ///
    /// Returns `None` while the sample or the price is still the
    /// "no data" sentinel; the consumer renders a loading state.
    pub fn compute(
        network: NetworkKey,
        sample: &GasSample,
        amount_eth: f64,
        gas_units: u64,
        eth_usd: f64,
        balance_eth: Option<f64>,
    ) -> Option<Self> {
        if !sample.has_data() || eth_usd <= 0.0 {
            return None;
        }

        let max_fee_gwei = sample.base_fee + sample.priority_fee;
        let gas_cost_eth = max_fee_gwei * gas_units as f64 / 1e9;
        let gas_cost_usd =
            estimate_cost_usd(sample.base_fee, sample.priority_fee, gas_units, eth_usd);
        let amount_usd = amount_eth * eth_usd;
        let total_cost_eth = amount_eth + gas_cost_eth;
        let total_cost_usd = amount_usd + gas_cost_usd;
        let fee_share_of_amount_pct = if amount_usd > 0.0 {
            gas_cost_usd / amount_usd * 100.0
        } else {
            0.0
        };
        let affordable = balance_eth.map_or(true, |balance| total_cost_eth <= balance);

        Some(Self {
            network,
            amount_eth,
            gas_units,
            max_fee_gwei,
            priority_fee_gwei: sample.priority_fee,
            gas_cost_eth,
            gas_cost_usd,
            amount_usd,
            total_cost_eth,
            total_cost_usd,
            fee_share_of_amount_pct,
            affordable,
        })
    }
}
