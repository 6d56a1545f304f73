//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the Quorum Cop besides the registry's own
//! `BlockchainReader`, `CryptoProvider` and `TimeSource`.

use crate::domain::QuorumCopResult;
use parking_lot::Mutex;
use shared_types::{DeregisterVote, PublicKey, Transaction};
use sn_01_service_node_list::QuorumState;
use std::collections::{BTreeMap, HashSet};

/// Read access to the registry's quorums and membership.
///
/// Production: `ServiceNodeList` (adapters/registry.rs).
pub trait QuorumStateSource: Send + Sync {
    /// Cached quorum for `height`.
    fn quorum_state(&self, height: u64) -> Option<QuorumState>;

    /// True if `pubkey` is registered.
    fn is_service_node(&self, pubkey: &PublicKey) -> bool;
}

/// Where this node's deregistration votes go.
///
/// Production: `PoolVoteSubmitter` (adapters/submitter.rs).
pub trait VoteSubmitter: Send + Sync {
    /// Submit one signed vote.
    fn submit_vote(&self, vote: &DeregisterVote) -> QuorumCopResult<()>;
}

/// Receiver of deregistration transactions ready for the tx pool.
pub trait DeregisterTxSink: Send + Sync {
    /// Relay `tx`.
    fn relay_deregister_tx(&self, tx: Transaction);
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Fixed quorums and membership for testing.
#[derive(Default)]
pub struct MockQuorumSource {
    /// Quorum by height.
    pub quorums: Mutex<BTreeMap<u64, QuorumState>>,
    /// Registered keys.
    pub registered: Mutex<HashSet<PublicKey>>,
}

impl QuorumStateSource for MockQuorumSource {
    fn quorum_state(&self, height: u64) -> Option<QuorumState> {
        self.quorums.lock().get(&height).cloned()
    }

    fn is_service_node(&self, pubkey: &PublicKey) -> bool {
        self.registered.lock().contains(pubkey)
    }
}

/// Submitter that records votes and can be told to fail.
#[derive(Default)]
pub struct MockVoteSubmitter {
    /// Accepted votes in submission order.
    pub votes: Mutex<Vec<DeregisterVote>>,
    /// Reject every vote while set.
    pub fail: Mutex<bool>,
}

impl VoteSubmitter for MockVoteSubmitter {
    fn submit_vote(&self, vote: &DeregisterVote) -> QuorumCopResult<()> {
        if *self.fail.lock() {
            return Err(crate::domain::QuorumCopError::MissingQuorumState(
                vote.block_height,
            ));
        }
        self.votes.lock().push(*vote);
        Ok(())
    }
}

/// Sink that keeps every relayed transaction.
#[derive(Default)]
pub struct MockTxSink {
    /// Relayed transactions.
    pub txs: Mutex<Vec<Transaction>>,
}

impl DeregisterTxSink for MockTxSink {
    fn relay_deregister_tx(&self, tx: Transaction) {
        self.txs.lock().push(tx);
    }
}
