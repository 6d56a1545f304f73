//! # Quorum Selection
//!
//! Voters and test candidates for a height, drawn from the fully funded
//! nodes with the block-hash-seeded generator.

use super::prng::{portable_shuffle, rng_from_hash};
use crate::domain::{
    NodeInfo, QuorumState, MIN_NODES_TO_TEST, NTH_OF_THE_NETWORK_TO_TEST, QUORUM_SIZE,
};
use shared_types::{Hash, PublicKey};
use std::collections::BTreeMap;

/// Compute the quorum state for the block with `block_hash`.
///
/// Keys enter the shuffle in ascending byte order. The first `QUORUM_SIZE`
/// shuffled keys vote; the next `max(rem / K, min(FLOOR, rem))` are tested.
pub fn generate_quorum_state(
    infos: &BTreeMap<PublicKey, NodeInfo>,
    block_hash: &Hash,
) -> QuorumState {
    let funded: Vec<PublicKey> = infos
        .iter()
        .filter(|(_, info)| info.is_fully_funded())
        .map(|(key, _)| *key)
        .collect();

    let mut indexes: Vec<usize> = (0..funded.len()).collect();
    let mut rng = rng_from_hash(block_hash);
    portable_shuffle(&mut indexes, &mut rng);

    let quorum_len = funded.len().min(QUORUM_SIZE);
    let remaining = funded.len() - quorum_len;
    let test_len = (remaining / NTH_OF_THE_NETWORK_TO_TEST).max(MIN_NODES_TO_TEST.min(remaining));

    let quorum_nodes = indexes[..quorum_len].iter().map(|&i| funded[i]).collect();
    let nodes_to_test = indexes[quorum_len..quorum_len + test_len]
        .iter()
        .map(|&i| funded[i])
        .collect();

    QuorumState {
        quorum_nodes,
        nodes_to_test,
    }
}
