//! ETH/USD price derivation from Uniswap V3 pool state.

use alloy::primitives::U256;
use tracing::warn;

/// Lowest ETH/USD value the derivation will accept.
pub const PRICE_BAND_MIN: f64 = 100.0;
/// Highest ETH/USD value the derivation will accept.
pub const PRICE_BAND_MAX: f64 = 10_000.0;
/// Substitute when derivation fails or leaves the sanity band.
pub const FALLBACK_ETH_USD: f64 = 2_000.0;

/// Derive the ETH/USD price from a pool's Q64.96 sqrt price.
///
/// `(sqrtPriceX96^2 * 10^12) / 2^192` gives USDC per ETH-wei adjusted for
/// the pair's 12-decimal difference; inverting yields ETH in USD. Values
/// outside `[PRICE_BAND_MIN, PRICE_BAND_MAX]` are discarded in favor of
/// [`FALLBACK_ETH_USD`]; they indicate a pool misread or decimal error,
/// not a price.
///
/// Deterministic and side-effect free apart from the anomaly log.
pub fn price_from_sqrt_x96(sqrt_price_x96: U256) -> f64 {
    let sqrt_price = sqrt_price_x96.to_string().parse::<f64>().unwrap_or(0.0);
    let raw = sqrt_price * sqrt_price * 1e12 / 2f64.powi(192);
    let eth_usd = 1.0 / raw;

    if !eth_usd.is_finite() || !(PRICE_BAND_MIN..=PRICE_BAND_MAX).contains(&eth_usd) {
        warn!(derived = eth_usd, "Derived price outside sanity band");
        return FALLBACK_ETH_USD;
    }

    eth_usd
}
