//! # Deregistration Vote Pool
//!
//! Collects quorum votes per `(block_height, service_node_index)` until
//! enough distinct voters agree, then produces the deregistration
//! transaction once, carrying the votes that reached the threshold.

use super::errors::VotePoolError;
use shared_types::{
    DeregisterExtra, DeregisterVote, DeregisterVoteEntry, Transaction, TxExtra, TxType,
};
use sn_01_service_node_list::domain::{MIN_VOTES_TO_KICK_SERVICE_NODE, VOTE_LIFETIME_BY_HEIGHT};
use sn_01_service_node_list::validation::verify_vote;
use sn_01_service_node_list::{CryptoProvider, QuorumState};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of offering a vote to the pool.
#[derive(Debug, Clone, Default)]
pub struct VoteOutcome {
    /// False if this voter already voted on the candidate.
    pub added: bool,
    /// Deregistration ready for the tx pool, once the threshold is met.
    pub deregister_tx: Option<Transaction>,
}

/// Votes waiting for a deregistration to be mined.
#[derive(Debug, Default)]
pub struct DeregisterVotePool {
    votes: BTreeMap<(u64, u32), Vec<DeregisterVoteEntry>>,
}

impl DeregisterVotePool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidates with pending votes.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// True if no votes are pending.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Votes collected against candidate `service_node_index` at `block_height`.
    pub fn votes_for(&self, block_height: u64, service_node_index: u32) -> &[DeregisterVoteEntry] {
        self.votes
            .get(&(block_height, service_node_index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Verify `vote` against `quorum` and add it.
    pub fn add_vote<C: CryptoProvider + ?Sized>(
        &mut self,
        crypto: &C,
        vote: &DeregisterVote,
        quorum: &QuorumState,
        current_height: u64,
    ) -> Result<VoteOutcome, VotePoolError> {
        if vote.block_height >= current_height
            || current_height - vote.block_height >= VOTE_LIFETIME_BY_HEIGHT
        {
            return Err(VotePoolError::OutOfWindow {
                height: vote.block_height,
                current: current_height,
            });
        }
        verify_vote(crypto, vote, quorum)?;

        let key = (vote.block_height, vote.service_node_index);
        let votes = self.votes.entry(key).or_default();
        if votes
            .iter()
            .any(|v| v.voters_quorum_index == vote.voters_quorum_index)
        {
            debug!(
                height = vote.block_height,
                index = vote.service_node_index,
                voter = vote.voters_quorum_index,
                "Duplicate deregistration vote"
            );
            return Ok(VoteOutcome::default());
        }
        votes.push(DeregisterVoteEntry {
            voters_quorum_index: vote.voters_quorum_index,
            signature: vote.signature,
        });

        // Emitted once, on the vote that reaches the threshold.
        if votes.len() != MIN_VOTES_TO_KICK_SERVICE_NODE {
            return Ok(VoteOutcome {
                added: true,
                deregister_tx: None,
            });
        }

        let extra = DeregisterExtra {
            block_height: vote.block_height,
            service_node_index: vote.service_node_index,
            votes: votes.clone(),
        };
        info!(
            height = vote.block_height,
            index = vote.service_node_index,
            votes = extra.votes.len(),
            "Deregistration reached quorum"
        );
        Ok(VoteOutcome {
            added: true,
            deregister_tx: Some(deregister_tx(crypto, extra)),
        })
    }

    /// Drop votes consumed by the deregistrations in `txs`.
    pub fn remove_used_votes(&mut self, txs: &[Transaction]) {
        for tx in txs.iter().filter(|tx| tx.is_deregister()) {
            if let Some(extra) = &tx.extra.service_node_deregister {
                self.votes
                    .remove(&(extra.block_height, extra.service_node_index));
            }
        }
    }

    /// Drop votes that can no longer enter a block at `height`.
    pub fn remove_expired_votes(&mut self, height: u64) {
        if height < VOTE_LIFETIME_BY_HEIGHT {
            return;
        }
        let oldest = height - VOTE_LIFETIME_BY_HEIGHT;
        self.votes = self.votes.split_off(&(oldest, 0));
    }
}

fn deregister_tx<C: CryptoProvider + ?Sized>(crypto: &C, extra: DeregisterExtra) -> Transaction {
    let mut id = extra.block_height.to_le_bytes().to_vec();
    id.extend_from_slice(&extra.service_node_index.to_le_bytes());
    for vote in &extra.votes {
        id.extend_from_slice(&vote.voters_quorum_index.to_le_bytes());
        id.extend_from_slice(vote.signature.as_bytes());
    }
    Transaction {
        hash: crypto.fast_hash(&id),
        tx_type: TxType::Deregister,
        outputs: Vec::new(),
        extra: TxExtra {
            service_node_deregister: Some(extra),
            ..TxExtra::default()
        },
    }
}
