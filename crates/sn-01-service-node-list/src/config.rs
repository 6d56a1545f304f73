//! # Registry Configuration
//!
//! Configuration for the Service Node List service.

use serde::{Deserialize, Serialize};
use shared_types::NetworkType;

/// Service node list configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Network whose staking rules apply.
    pub network_type: NetworkType,

    /// Blocks fetched per batch while rebuilding.
    pub rebuild_batch_size: u64,

    /// Check domain invariants after every processed block.
    pub check_invariants: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            rebuild_batch_size: 1000,
            check_invariants: false,
        }
    }
}

impl RegistryConfig {
    /// Create a config for testing (fakechain, small batches, invariant checks on).
    pub fn for_testing() -> Self {
        Self {
            network_type: NetworkType::Fakechain,
            rebuild_batch_size: 7,
            check_invariants: true,
        }
    }
}
