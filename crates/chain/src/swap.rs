//! Uniswap V3 Swap event parsing.

use alloy::primitives::U256;
use alloy::rpc::types::Log;
use tracing::debug;

/// Event signature constants for Uniswap V3 pools.
pub mod swap_signatures {
    use alloy::primitives::B256;

    /// keccak256("Swap(address,address,int256,int256,uint160,uint128,int24)")
    pub const SWAP: B256 = B256::new([
        0xc4, 0x20, 0x79, 0xf9, 0x4a, 0x63, 0x50, 0xd7, 0xe6, 0x23, 0x5f, 0x29, 0x17, 0x49, 0x24,
        0xf9, 0x28, 0xcc, 0x2a, 0xc8, 0x18, 0xeb, 0x64, 0xfe, 0xd8, 0x00, 0x4e, 0x11, 0x5f, 0xbc,
        0xca, 0x67,
    ]);
}

/// Pool state extracted from one Swap event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapObservation {
    /// Post-swap sqrt price, Q64.96 fixed point.
    pub sqrt_price_x96: U256,
    /// Block number the swap landed in (0 when the log carried none).
    pub block_number: u64,
}

/// Parse a log into a [`SwapObservation`].
///
/// Swap(address indexed sender, address indexed recipient, int256 amount0,
/// int256 amount1, uint160 sqrtPriceX96, uint128 liquidity, int24 tick)
///
/// Data words: amount0, amount1, sqrtPriceX96, liquidity, tick.
/// Malformed logs yield `None`; the caller skips them.
pub fn parse_swap_log(log: &Log) -> Option<SwapObservation> {
    if log.topics().first().copied() != Some(swap_signatures::SWAP) {
        return None;
    }

    let data = &log.data().data;
    if data.len() < 96 {
        debug!(
            address = %log.address(),
            len = data.len(),
            "Swap log data too short"
        );
        return None;
    }

    // sqrtPriceX96 is the third data word, left-padded to 32 bytes.
    let sqrt_price_x96 = U256::from_be_slice(&data[64..96]);
    if sqrt_price_x96.is_zero() {
        return None;
    }

    Some(SwapObservation {
        sqrt_price_x96,
        block_number: log.block_number.unwrap_or(0),
    })
}
