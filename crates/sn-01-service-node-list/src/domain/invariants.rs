//! # Domain Invariants
//!
//! Protocol constants and the rules that must hold for every node and
//! every quorum at every height.

use super::entities::{NodeInfo, QuorumState, SwarmId};
use super::errors::ServiceNodeError;
use shared_types::PublicKey;
use std::collections::{BTreeMap, HashSet};

/// Fixed-point denominator for stake shares.
pub const STAKING_PORTIONS: u64 = 0xffff_ffff_ffff_fffc;

/// Maximum contributors per node, operator included.
pub const MAX_NUMBER_OF_CONTRIBUTORS: usize = 4;

/// Maximum locked key images per contributor.
pub const MAX_KEY_IMAGES_PER_CONTRIBUTOR: usize = 1;

/// Voters per quorum.
pub const QUORUM_SIZE: usize = 10;

/// Votes needed to deregister a node.
pub const MIN_VOTES_TO_KICK_SERVICE_NODE: usize = 7;

/// One in this many non-quorum nodes is tested per height.
pub const NTH_OF_THE_NETWORK_TO_TEST: usize = 100;

/// Lower bound on nodes tested per height, network size permitting.
pub const MIN_NODES_TO_TEST: usize = 50;

/// Rollback events older than this many blocks are discarded.
pub const ROLLBACK_EVENT_EXPIRATION_BLOCKS: u64 = 30;

/// Blocks during which a quorum may vote.
pub const VOTE_LIFETIME_BY_HEIGHT: u64 = 120;

/// Blocks during which a deregistration tx may be mined.
pub const DEREGISTER_TX_LIFETIME_BY_HEIGHT: u64 = VOTE_LIFETIME_BY_HEIGHT;

/// Blocks a quorum state stays cached.
pub const QUORUM_LIFETIME: u64 = 6 * DEREGISTER_TX_LIFETIME_BY_HEIGHT;

/// Heights this close to the tip are not judged.
pub const REORG_SAFETY_BUFFER_IN_BLOCKS: u64 = 20;

/// Extra blocks a node lives past its lock period from the grace period fork.
pub const STAKING_REQUIREMENT_LOCK_BLOCKS_EXCESS: u64 = 20;

/// Lifetime of a signed registration command, in seconds.
pub const STAKING_AUTHORIZATION_EXPIRATION_WINDOW: u64 = 60 * 60 * 24 * 14;

/// `requested_unlock_height` of a node nobody asked to unlock.
pub const KEY_IMAGE_AWAITING_UNLOCK_HEIGHT: u64 = 0;

/// Swarm id of nodes waiting for placement.
pub const QUEUE_SWARM_ID: SwarmId = u64::MAX;

/// Smallest healthy swarm.
pub const MIN_SWARM_SIZE: usize = 5;

/// Swarms are filled up to this size before new ones are minted.
pub const MAX_SWARM_SIZE: usize = 10;

/// Queue slack kept before minting a swarm.
pub const SWARM_BUFFER: usize = 5;

/// Size of a freshly minted swarm.
pub const IDEAL_SWARM_SIZE: usize = MIN_SWARM_SIZE + 2;

/// Key under which the registry blob is persisted.
pub const SERVICE_NODE_STATE_KEY: &[u8] = b"service_node_list";

/// Version tag of the persisted blob.
pub const PERSISTED_STATE_VERSION: u32 = 1;

/// Invariant: stake accounting is consistent.
///
/// `sum(amount) == total_contributed <= total_reserved == sum(reserved) <= staking_requirement`.
pub fn invariant_stake_accounting(info: &NodeInfo) -> Result<(), ServiceNodeError> {
    let contributed: u128 = info.contributors.iter().map(|c| c.amount as u128).sum();
    let reserved: u128 = info.contributors.iter().map(|c| c.reserved as u128).sum();

    if contributed != info.total_contributed as u128 {
        return Err(ServiceNodeError::InvariantViolation(format!(
            "contributed {} != total_contributed {}",
            contributed, info.total_contributed
        )));
    }
    if reserved != info.total_reserved as u128 {
        return Err(ServiceNodeError::InvariantViolation(format!(
            "reserved {} != total_reserved {}",
            reserved, info.total_reserved
        )));
    }
    if info.total_contributed > info.total_reserved {
        return Err(ServiceNodeError::InvariantViolation(
            "total_contributed exceeds total_reserved".to_string(),
        ));
    }
    if info.total_reserved > info.staking_requirement {
        return Err(ServiceNodeError::InvariantViolation(
            "total_reserved exceeds staking_requirement".to_string(),
        ));
    }
    Ok(())
}

/// Invariant: contributor addresses are unique and bounded.
pub fn invariant_contributor_slots(info: &NodeInfo) -> Result<(), ServiceNodeError> {
    if info.contributors.len() > MAX_NUMBER_OF_CONTRIBUTORS {
        return Err(ServiceNodeError::InvariantViolation(format!(
            "{} contributors",
            info.contributors.len()
        )));
    }
    let mut seen = HashSet::new();
    for contributor in &info.contributors {
        if !seen.insert(contributor.address) {
            return Err(ServiceNodeError::InvariantViolation(format!(
                "duplicate contributor {}",
                contributor.address
            )));
        }
        if contributor.locked_contributions.len() > MAX_KEY_IMAGES_PER_CONTRIBUTOR {
            return Err(ServiceNodeError::InvariantViolation(format!(
                "contributor {} has {} locked contributions",
                contributor.address,
                contributor.locked_contributions.len()
            )));
        }
    }
    Ok(())
}

/// Invariant: voters and candidates are disjoint fully funded nodes.
pub fn invariant_quorum_membership(
    quorum: &QuorumState,
    infos: &BTreeMap<PublicKey, NodeInfo>,
) -> Result<(), ServiceNodeError> {
    let voters: HashSet<_> = quorum.quorum_nodes.iter().collect();
    for key in quorum.quorum_nodes.iter().chain(&quorum.nodes_to_test) {
        match infos.get(key) {
            Some(info) if info.is_fully_funded() => {}
            _ => {
                return Err(ServiceNodeError::InvariantViolation(format!(
                    "{} is not a fully funded node",
                    key
                )))
            }
        }
    }
    if quorum.nodes_to_test.iter().any(|k| voters.contains(k)) {
        return Err(ServiceNodeError::InvariantViolation(
            "quorum_nodes and nodes_to_test overlap".to_string(),
        ));
    }
    Ok(())
}
