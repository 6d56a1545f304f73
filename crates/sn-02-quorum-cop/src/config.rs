//! # Quorum Cop Configuration

use serde::{Deserialize, Serialize};
use shared_types::NetworkType;

/// Quorum Cop configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumCopConfig {
    /// Network whose fork rules gate uptime proof versions.
    pub network_type: NetworkType,

    /// Seconds this node must run before it votes.
    pub min_uptime_before_voting_secs: u64,
}

impl Default for QuorumCopConfig {
    fn default() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            min_uptime_before_voting_secs: 2 * 60 * 60,
        }
    }
}

impl QuorumCopConfig {
    /// Create a config for testing (fakechain, votes immediately).
    pub fn for_testing() -> Self {
        Self {
            network_type: NetworkType::Fakechain,
            min_uptime_before_voting_secs: 0,
        }
    }
}
