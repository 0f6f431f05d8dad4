//! Tracked network identities and per-network fee fallback policy.

use serde::{Deserialize, Serialize};

/// Closed set of tracked networks.
///
/// Adding a network means adding a variant here plus its [`FeePolicy`]
/// row and a WebSocket endpoint in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKey {
    Ethereum,
    Polygon,
    Arbitrum,
}

impl NetworkKey {
    /// All tracked networks, in display order.
    pub const ALL: [NetworkKey; 3] = [
        NetworkKey::Ethereum,
        NetworkKey::Polygon,
        NetworkKey::Arbitrum,
    ];

    /// Human-readable network name.
    pub fn name(&self) -> &'static str {
        match self {
            NetworkKey::Ethereum => "ethereum",
            NetworkKey::Polygon => "polygon",
            NetworkKey::Arbitrum => "arbitrum",
        }
    }

    /// EVM chain ID.
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkKey::Ethereum => 1,
            NetworkKey::Polygon => 137,
            NetworkKey::Arbitrum => 42161,
        }
    }

    /// Fallback fee policy for this network.
    pub fn fee_policy(&self) -> FeePolicy {
        match self {
            NetworkKey::Ethereum => FeePolicy {
                default_priority_fee_gwei: 1.5,
                history_priority_fee_gwei: 2.0,
            },
            // Polygon validators expect structurally higher tips.
            NetworkKey::Polygon => FeePolicy {
                default_priority_fee_gwei: 30.0,
                history_priority_fee_gwei: 2.0,
            },
            // Arbitrum sequencing makes tips nearly irrelevant.
            NetworkKey::Arbitrum => FeePolicy {
                default_priority_fee_gwei: 0.1,
                history_priority_fee_gwei: 2.0,
            },
        }
    }
}

impl std::fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-network fee defaults consulted when every RPC tier fails.
///
/// Kept as one table instead of inline literals so the cascade's final
/// tier is visible and testable configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePolicy {
    /// Tier-3 priority fee for the live sampling cascade, in Gwei.
    pub default_priority_fee_gwei: f64,
    /// Nominal priority fee recorded on history points, in Gwei.
    /// History is a coarse trend signal, so the cascade is skipped.
    pub history_priority_fee_gwei: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_ids() {
        assert_eq!(NetworkKey::Ethereum.chain_id(), 1);
        assert_eq!(NetworkKey::Polygon.chain_id(), 137);
        assert_eq!(NetworkKey::Arbitrum.chain_id(), 42161);
    }

    #[test]
    fn test_fee_policy_defaults() {
        assert_eq!(NetworkKey::Ethereum.fee_policy().default_priority_fee_gwei, 1.5);
        assert_eq!(NetworkKey::Polygon.fee_policy().default_priority_fee_gwei, 30.0);
        assert_eq!(NetworkKey::Arbitrum.fee_policy().default_priority_fee_gwei, 0.1);

        for network in NetworkKey::ALL {
            assert_eq!(network.fee_policy().history_priority_fee_gwei, 2.0);
        }
    }

    #[test]
    fn test_serde_names() {
        let key: NetworkKey = serde_json::from_str("\"polygon\"").unwrap();
        assert_eq!(key, NetworkKey::Polygon);
        assert_eq!(key.name(), "polygon");
    }
}
