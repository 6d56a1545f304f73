//! # Domain Entities
//!
//! Registered node records, quorum states and the key image blacklist.

use super::errors::ServiceNodeError;
use super::invariants::{
    invariant_contributor_slots, invariant_stake_accounting, KEY_IMAGE_AWAITING_UNLOCK_HEIGHT,
    QUEUE_SWARM_ID,
};
use serde::{Deserialize, Serialize};
use shared_types::{AccountAddress, KeyImage, PublicKey, SecretKey};

/// Identifier of a storage swarm.
pub type SwarmId = u64;

/// Schema of a `NodeInfo`, fixed at registration from the hard fork version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum NodeInfoVersion {
    /// Stake locked by output unlock time.
    #[default]
    V0Legacy,
    /// Unlock-time stake with the re-registration grace period.
    V1GracePeriod,
    /// Stake locked by key image until an unlock is requested.
    V2InfiniteStaking,
}

/// A staked output whose key image is locked while the node lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedContribution {
    /// One-time output key; signs unlock requests.
    pub key_image_pub_key: PublicKey,
    /// Key image that would spend the output.
    pub key_image: KeyImage,
    /// Output amount.
    pub amount: u64,
}

/// One funder of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Funding wallet.
    pub address: AccountAddress,
    /// Amount contributed so far.
    pub amount: u64,
    /// Amount this contributor may still fund up to.
    pub reserved: u64,
    /// Locked outputs (infinite staking only).
    pub locked_contributions: Vec<LockedContribution>,
}

impl Contributor {
    /// New contributor with a reservation and nothing paid in.
    pub fn new(address: AccountAddress, reserved: u64) -> Self {
        Self {
            address,
            amount: 0,
            reserved,
            locked_contributions: Vec::new(),
        }
    }
}

/// A registered service node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Schema version.
    pub version: NodeInfoVersion,
    /// Height of the registration transaction.
    pub registration_height: u64,
    /// Height at which the stake unlocks, or `KEY_IMAGE_AWAITING_UNLOCK_HEIGHT`.
    pub requested_unlock_height: u64,
    /// Height of the last reward or contribution.
    pub last_reward_block_height: u64,
    /// Tie breaker within `last_reward_block_height`; `u32::MAX` after a reward.
    pub last_reward_transaction_index: u32,
    /// Funders in registration order, operator first.
    pub contributors: Vec<Contributor>,
    /// Sum of `contributors[i].amount`.
    pub total_contributed: u64,
    /// Sum of `contributors[i].reserved`.
    pub total_reserved: u64,
    /// Stake the node needs to be fully funded.
    pub staking_requirement: u64,
    /// Operator fee in portions.
    pub portions_for_operator: u64,
    /// Assigned swarm, or `QUEUE_SWARM_ID`.
    pub swarm_id: SwarmId,
    /// Operator wallet.
    pub operator_address: AccountAddress,
}

impl NodeInfo {
    /// Fresh record for a node registered at `registration_height`.
    pub fn new(
        version: NodeInfoVersion,
        registration_height: u64,
        staking_requirement: u64,
        operator_address: AccountAddress,
        portions_for_operator: u64,
    ) -> Self {
        Self {
            version,
            registration_height,
            requested_unlock_height: KEY_IMAGE_AWAITING_UNLOCK_HEIGHT,
            last_reward_block_height: registration_height,
            last_reward_transaction_index: 0,
            contributors: Vec::new(),
            total_contributed: 0,
            total_reserved: 0,
            staking_requirement,
            portions_for_operator,
            swarm_id: QUEUE_SWARM_ID,
            operator_address,
        }
    }

    /// True once the stake requirement is met.
    pub fn is_fully_funded(&self) -> bool {
        self.total_contributed >= self.staking_requirement
    }

    /// Number of locked key images across all contributors.
    pub fn total_num_locked_contributions(&self) -> usize {
        self.contributors
            .iter()
            .map(|c| c.locked_contributions.len())
            .sum()
    }

    /// Position of `address` among the contributors.
    pub fn contributor_index(&self, address: &AccountAddress) -> Option<usize> {
        self.contributors.iter().position(|c| &c.address == address)
    }

    /// True if the node has asked for its stake back.
    pub fn is_unlocking(&self) -> bool {
        self.requested_unlock_height != KEY_IMAGE_AWAITING_UNLOCK_HEIGHT
    }

    /// Check the stake accounting and contributor slot invariants.
    pub fn check_invariants(&self) -> Result<(), ServiceNodeError> {
        invariant_stake_accounting(self)?;
        invariant_contributor_slots(self)
    }

    #[cfg(test)]
    pub(crate) fn for_testing(staking_requirement: u64) -> Self {
        Self::new(
            NodeInfoVersion::V2InfiniteStaking,
            0,
            staking_requirement,
            AccountAddress::NULL,
            0,
        )
    }
}

/// Voters and candidates for one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuorumState {
    /// Nodes that vote at this height.
    pub quorum_nodes: Vec<PublicKey>,
    /// Nodes whose liveness is judged at this height.
    pub nodes_to_test: Vec<PublicKey>,
}

/// A key image that may not be spent before `unlock_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyImageBlacklistEntry {
    /// Blacklisted key image.
    pub key_image: KeyImage,
    /// Height from which the entry is dropped.
    pub unlock_height: u64,
}

/// Operating keys of the local service node.
#[derive(Debug, Clone)]
pub struct ServiceNodeKeys {
    /// Node public key.
    pub public_key: PublicKey,
    /// Node secret key.
    pub secret_key: SecretKey,
}

/// A node key with its record, as returned by list queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNodePubkeyInfo {
    /// Node key.
    pub pubkey: PublicKey,
    /// Node record.
    pub info: NodeInfo,
}

/// Filter for list queries.
#[derive(Debug, Clone, Default)]
pub struct NodeListFilter {
    /// Only these keys; empty means all.
    pub pubkeys: Vec<PublicKey>,
    /// Skip nodes still collecting stake.
    pub fully_funded_only: bool,
}

/// Registration status of the local node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnStatus {
    /// Local node key.
    pub pubkey: PublicKey,
    /// Record, if registered.
    pub info: Option<NodeInfo>,
}
