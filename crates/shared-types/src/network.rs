//! # Network Parameters
//!
//! Network selection and the hard fork versions that gate service node rules.

use serde::{Deserialize, Serialize};

/// Atomic units per coin.
pub const COIN: u64 = 1_000_000_000;

/// Blocks per day at the two minute target.
pub const BLOCKS_EXPECTED_IN_DAYS: u64 = 720;

/// First hard fork with service nodes.
pub const HF_VERSION_SERVICE_NODES: u8 = 9;

/// Re-registration grace period and uptime proof version 2.
pub const HF_VERSION_GRACE_PERIOD: u8 = 10;

/// Stakes are locked by key image instead of unlock time.
pub const HF_VERSION_INFINITE_STAKING: u8 = 11;

/// Largest value of an output unlock time interpreted as a block height.
pub const CRYPTONOTE_MAX_BLOCK_NUMBER: u64 = 500_000_000;

/// Which chain the node runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NetworkType {
    /// Production chain.
    #[default]
    Mainnet,
    /// Public test chain.
    Testnet,
    /// Staging chain with mainnet economics.
    Stagenet,
    /// Local regression chain.
    Fakechain,
}

impl NetworkType {
    /// Height at which the service node hard fork activated.
    ///
    /// Test networks activate at genesis.
    pub fn service_node_fork_height(&self) -> u64 {
        match self {
            NetworkType::Mainnet => 101_250,
            NetworkType::Stagenet => 96_210,
            NetworkType::Testnet | NetworkType::Fakechain => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_versions_are_ordered() {
        assert!(HF_VERSION_SERVICE_NODES < HF_VERSION_GRACE_PERIOD);
        assert!(HF_VERSION_GRACE_PERIOD < HF_VERSION_INFINITE_STAKING);
    }

    #[test]
    fn test_fork_heights() {
        assert_eq!(NetworkType::Mainnet.service_node_fork_height(), 101_250);
        assert_eq!(NetworkType::Fakechain.service_node_fork_height(), 0);
    }
}
