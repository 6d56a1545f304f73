//! # Vote Validation
//!
//! Stateless checks of deregistration votes against the quorum that cast them.

use crate::domain::{
    vote_hash_input, QuorumState, ServiceNodeError, ServiceNodeResult,
    MIN_VOTES_TO_KICK_SERVICE_NODE,
};
use crate::ports::CryptoProvider;
use shared_types::{DeregisterExtra, DeregisterVote, Hash};
use std::collections::HashSet;

/// Hash signed by every voter for `(block_height, service_node_index)`.
pub fn vote_hash<C: CryptoProvider + ?Sized>(
    crypto: &C,
    block_height: u64,
    service_node_index: u32,
) -> Hash {
    crypto.fast_hash(&vote_hash_input(block_height, service_node_index))
}

fn check_candidate_index(index: u32, quorum: &QuorumState) -> ServiceNodeResult<()> {
    if index as usize >= quorum.nodes_to_test.len() {
        return Err(ServiceNodeError::ServiceNodeIndexOutOfBounds {
            index,
            len: quorum.nodes_to_test.len(),
        });
    }
    Ok(())
}

fn check_voter<C: CryptoProvider + ?Sized>(
    crypto: &C,
    hash: &Hash,
    voters_quorum_index: u32,
    signature: &shared_types::Signature,
    quorum: &QuorumState,
) -> ServiceNodeResult<()> {
    let voter = quorum
        .quorum_nodes
        .get(voters_quorum_index as usize)
        .ok_or(ServiceNodeError::VoterIndexOutOfBounds {
            index: voters_quorum_index,
            len: quorum.quorum_nodes.len(),
        })?;
    if !crypto.check_signature(hash, voter, signature) {
        return Err(ServiceNodeError::InvalidSignature);
    }
    Ok(())
}

/// Verify a single vote.
pub fn verify_vote<C: CryptoProvider + ?Sized>(
    crypto: &C,
    vote: &DeregisterVote,
    quorum: &QuorumState,
) -> ServiceNodeResult<()> {
    check_candidate_index(vote.service_node_index, quorum)?;
    let hash = vote_hash(crypto, vote.block_height, vote.service_node_index);
    check_voter(
        crypto,
        &hash,
        vote.voters_quorum_index,
        &vote.signature,
        quorum,
    )
}

/// Verify a deregistration payload.
///
/// Needs `MIN_VOTES_TO_KICK_SERVICE_NODE` distinct valid voters and an
/// in-bounds candidate.
pub fn verify_deregister<C: CryptoProvider + ?Sized>(
    crypto: &C,
    deregister: &DeregisterExtra,
    quorum: &QuorumState,
) -> ServiceNodeResult<()> {
    if deregister.votes.len() < MIN_VOTES_TO_KICK_SERVICE_NODE {
        return Err(ServiceNodeError::NotEnoughVotes {
            got: deregister.votes.len(),
            required: MIN_VOTES_TO_KICK_SERVICE_NODE,
        });
    }
    check_candidate_index(deregister.service_node_index, quorum)?;

    let hash = vote_hash(crypto, deregister.block_height, deregister.service_node_index);
    let mut seen = HashSet::new();
    for vote in &deregister.votes {
        if !seen.insert(vote.voters_quorum_index) {
            return Err(ServiceNodeError::DuplicateVoter(vote.voters_quorum_index));
        }
        check_voter(
            crypto,
            &hash,
            vote.voters_quorum_index,
            &vote.signature,
            quorum,
        )?;
    }
    Ok(())
}
