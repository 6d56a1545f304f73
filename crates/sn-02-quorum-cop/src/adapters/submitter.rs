//! Vote submitter backed by the local deregistration vote pool.

use crate::domain::{DeregisterVotePool, QuorumCopError, QuorumCopResult};
use crate::ports::{DeregisterTxSink, QuorumStateSource, VoteSubmitter};
use parking_lot::Mutex;
use shared_types::{Block, BlockAddedHook, DeregisterVote, Transaction};
use sn_01_service_node_list::{BlockchainReader, CryptoProvider};
use std::sync::Arc;
use tracing::debug;

/// Feeds votes into a `DeregisterVotePool` and relays finished
/// deregistrations to the sink.
pub struct PoolVoteSubmitter<Q, B, C, K>
where
    Q: QuorumStateSource,
    B: BlockchainReader,
    C: CryptoProvider,
    K: DeregisterTxSink,
{
    quorums: Arc<Q>,
    blockchain: Arc<B>,
    crypto: Arc<C>,
    sink: Arc<K>,
    pool: Mutex<DeregisterVotePool>,
}

impl<Q, B, C, K> PoolVoteSubmitter<Q, B, C, K>
where
    Q: QuorumStateSource,
    B: BlockchainReader,
    C: CryptoProvider,
    K: DeregisterTxSink,
{
    /// Submitter with an empty pool.
    pub fn new(quorums: Arc<Q>, blockchain: Arc<B>, crypto: Arc<C>, sink: Arc<K>) -> Self {
        Self {
            quorums,
            blockchain,
            crypto,
            sink,
            pool: Mutex::new(DeregisterVotePool::new()),
        }
    }

    /// Number of candidates with pending votes.
    pub fn pending(&self) -> usize {
        self.pool.lock().len()
    }
}

impl<Q, B, C, K> VoteSubmitter for PoolVoteSubmitter<Q, B, C, K>
where
    Q: QuorumStateSource,
    B: BlockchainReader,
    C: CryptoProvider,
    K: DeregisterTxSink,
{
    fn submit_vote(&self, vote: &DeregisterVote) -> QuorumCopResult<()> {
        let quorum = self
            .quorums
            .quorum_state(vote.block_height)
            .ok_or(QuorumCopError::MissingQuorumState(vote.block_height))?;
        let current_height = self.blockchain.current_height();
        let outcome =
            self.pool
                .lock()
                .add_vote(&*self.crypto, vote, &quorum, current_height)?;
        if let Some(tx) = outcome.deregister_tx {
            debug!(tx = %tx.hash, "Relaying deregistration");
            self.sink.relay_deregister_tx(tx);
        }
        Ok(())
    }
}

impl<Q, B, C, K> BlockAddedHook for PoolVoteSubmitter<Q, B, C, K>
where
    Q: QuorumStateSource,
    B: BlockchainReader,
    C: CryptoProvider,
    K: DeregisterTxSink,
{
    fn block_added(&self, block: &Block, txs: &[Transaction]) {
        let mut pool = self.pool.lock();
        pool.remove_used_votes(txs);
        pool.remove_expired_votes(block.height);
    }
}
