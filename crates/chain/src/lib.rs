//! Feewatch chain interaction layer.
//!
//! This crate provides:
//! - Persistent WebSocket connection management per tracked network
//! - Block header and fee-estimation RPC access
//! - Uniswap V3 Swap event filtering and log parsing
//!
//! Everything network-facing lives here; the derivation and state logic
//! lives in `feewatch-core`.

mod connection;
mod swap;

pub use connection::{ChainConnection, ConnectError, FeeSource, HeaderInfo};
pub use swap::{parse_swap_log, swap_signatures, SwapObservation};
