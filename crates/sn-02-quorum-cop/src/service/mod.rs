//! Quorum Cop Service
//!
//! # Architecture
//! - Driven by `block_added`; judges each height once it is
//!   `REORG_SAFETY_BUFFER_IN_BLOCKS` deep and still inside the vote lifetime
//! - Votes against every tested node without an uptime proof younger than
//!   `UPTIME_PROOF_MAX_TIME_IN_SECONDS`
//! - Failed submissions are retried on later blocks while still in the window
//! - The state borrow is never held across a port call


use crate::config::QuorumCopConfig;
use crate::domain::{
    QuorumCopError, QuorumCopResult, SERVICE_NODE_VERSION, UPTIME_PROOF_BUFFER_IN_SECONDS,
    UPTIME_PROOF_FREQUENCY_IN_SECONDS, UPTIME_PROOF_MAX_TIME_IN_SECONDS,
};
use crate::ports::{QuorumCopApi, QuorumStateSource, VoteSubmitter};
use parking_lot::ReentrantMutex;
use shared_types::{
    Block, BlockAddedHook, BlockchainDetachedHook, DeregisterVote, InitHook, PublicKey,
    Transaction, UptimeProof, HF_VERSION_SERVICE_NODES,
};
use sn_01_service_node_list::domain::{
    uptime_proof_hash_input, REORG_SAFETY_BUFFER_IN_BLOCKS, VOTE_LIFETIME_BY_HEIGHT,
};
use sn_01_service_node_list::ports::SystemTimeSource;
use sn_01_service_node_list::validation::vote_hash;
use sn_01_service_node_list::{
    BlockchainReader, CryptoProvider, ServiceNodeKeys, StakingPolicy, TimeSource,
};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct CopState {
    /// Local arrival time of the last accepted proof per node.
    uptime_proof_seen: HashMap<PublicKey, u64>,
    /// Next height to judge.
    last_height: u64,
    /// Votes whose submission failed, as `(height, candidate index)`.
    retry: BTreeSet<(u64, u32)>,
}

/// Quorum Cop
///
/// Watches the quorums this node sits in and votes off unresponsive nodes.
pub struct QuorumCop<B, C, Q, V>
where
    B: BlockchainReader,
    C: CryptoProvider,
    Q: QuorumStateSource,
    V: VoteSubmitter,
{
    blockchain: Arc<B>,
    crypto: Arc<C>,
    quorums: Arc<Q>,
    submitter: Arc<V>,
    config: QuorumCopConfig,
    keys: Option<ServiceNodeKeys>,
    time_source: Box<dyn TimeSource>,
    start_time: u64,
    state: ReentrantMutex<RefCell<CopState>>,
}

/// Dependencies for QuorumCop
pub struct QuorumCopDependencies<B, C, Q, V> {
    /// Host chain
    pub blockchain: Arc<B>,
    /// Crypto backend
    pub crypto: Arc<C>,
    /// Quorums and membership
    pub quorums: Arc<Q>,
    /// Destination of votes
    pub submitter: Arc<V>,
    /// Service configuration
    pub config: QuorumCopConfig,
}

impl<B, C, Q, V> QuorumCop<B, C, Q, V>
where
    B: BlockchainReader,
    C: CryptoProvider,
    Q: QuorumStateSource,
    V: VoteSubmitter,
{
    /// Create a new QuorumCop; its uptime starts now.
    pub fn new(deps: QuorumCopDependencies<B, C, Q, V>) -> Self {
        let time_source: Box<dyn TimeSource> = Box::new(SystemTimeSource);
        let start_time = time_source.now();
        Self {
            blockchain: deps.blockchain,
            crypto: deps.crypto,
            quorums: deps.quorums,
            submitter: deps.submitter,
            config: deps.config,
            keys: None,
            time_source,
            start_time,
            state: ReentrantMutex::new(RefCell::new(CopState::default())),
        }
    }

    /// Set the operating keys; without them the cop never votes.
    pub fn with_keys(mut self, keys: ServiceNodeKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Set custom time source (for testing); uptime restarts from its clock.
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.start_time = time_source.now();
        self.time_source = time_source;
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CopState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn read_state<R>(&self, f: impl FnOnce(&CopState) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    fn proof_hash(&self, pubkey: &PublicKey, timestamp: u64) -> shared_types::Hash {
        self.crypto
            .fast_hash(&uptime_proof_hash_input(pubkey.as_bytes(), timestamp))
    }

    fn has_recent_proof(&self, pubkey: &PublicKey) -> bool {
        let now = self.time_source.now();
        self.read_state(|state| {
            state
                .uptime_proof_seen
                .get(pubkey)
                .map_or(false, |&seen| seen + UPTIME_PROOF_MAX_TIME_IN_SECONDS >= now)
        })
    }

    // === DUTIES ===

    fn run_duties(&self, block: &Block) {
        if block.major_version < HF_VERSION_SERVICE_NODES {
            return;
        }
        let Some(keys) = self.keys.as_ref() else {
            return;
        };
        let now = self.time_source.now();
        if now.saturating_sub(self.start_time) < self.config.min_uptime_before_voting_secs {
            return;
        }

        let pruned = self.prune_uptime_proofs();
        if pruned > 0 {
            debug!(pruned, "Dropped stale uptime proofs");
        }

        let latest = self
            .blockchain
            .current_height()
            .max(self.blockchain.target_height());
        if latest < VOTE_LIFETIME_BY_HEIGHT {
            return;
        }
        let from = latest - VOTE_LIFETIME_BY_HEIGHT;
        let height = block.height;
        if height < from {
            return;
        }
        let until = height.saturating_sub(REORG_SAFETY_BUFFER_IN_BLOCKS);

        let (mut targets, start) = self.with_state(|state| {
            let retries: Vec<(u64, u32)> = state.retry.split_off(&(from, 0)).into_iter().collect();
            state.retry.clear();
            let start = state.last_height.max(from);
            state.last_height = start.max(until);
            (retries, start)
        });

        for judged in start..until {
            let Some(quorum) = self.quorums.quorum_state(judged) else {
                warn!(height = judged, "No quorum state to judge");
                continue;
            };
            if !quorum.quorum_nodes.contains(&keys.public_key) {
                continue;
            }
            targets.extend((0..quorum.nodes_to_test.len() as u32).map(|index| (judged, index)));
        }

        for (judged, index) in targets {
            match self.cast_vote(keys, judged, index) {
                Ok(true) => info!(height = judged, index, "Voted to deregister service node"),
                Ok(false) => {}
                Err(e) => {
                    warn!(height = judged, index, error = %e, "Failed to submit deregistration vote");
                    self.with_state(|state| state.retry.insert((judged, index)));
                }
            }
        }
    }

    /// Vote against candidate `index` at `height` unless it proved uptime.
    fn cast_vote(&self, keys: &ServiceNodeKeys, height: u64, index: u32) -> QuorumCopResult<bool> {
        let quorum = self
            .quorums
            .quorum_state(height)
            .ok_or(QuorumCopError::MissingQuorumState(height))?;
        let Some(voter) = quorum
            .quorum_nodes
            .iter()
            .position(|key| key == &keys.public_key)
        else {
            return Ok(false);
        };
        let Some(candidate) = quorum.nodes_to_test.get(index as usize) else {
            return Ok(false);
        };
        if self.has_recent_proof(candidate) {
            return Ok(false);
        }

        let hash = vote_hash(&*self.crypto, height, index);
        let signature = self
            .crypto
            .generate_signature(&hash, &keys.public_key, &keys.secret_key)
            .ok_or(QuorumCopError::SigningFailed)?;
        self.submitter.submit_vote(&DeregisterVote {
            block_height: height,
            service_node_index: index,
            voters_quorum_index: voter as u32,
            signature,
        })?;
        Ok(true)
    }
}

impl<B, C, Q, V> QuorumCopApi for QuorumCop<B, C, Q, V>
where
    B: BlockchainReader,
    C: CryptoProvider,
    Q: QuorumStateSource,
    V: VoteSubmitter,
{
    fn handle_uptime_proof(&self, proof: &UptimeProof) -> QuorumCopResult<()> {
        let now = self.time_source.now();
        if proof.timestamp < now.saturating_sub(UPTIME_PROOF_BUFFER_IN_SECONDS)
            || proof.timestamp > now + UPTIME_PROOF_BUFFER_IN_SECONDS
        {
            return Err(QuorumCopError::TimestampOutOfRange {
                timestamp: proof.timestamp,
                now,
            });
        }
        if !self.quorums.is_service_node(&proof.pubkey) {
            return Err(QuorumCopError::UnknownServiceNode(proof.pubkey));
        }

        let hf_version = self
            .blockchain
            .hard_fork_version(self.blockchain.current_height().saturating_sub(1));
        let required = StakingPolicy::for_version(hf_version, self.config.network_type)
            .map_or(0, |policy| policy.min_uptime_proof_major_version());
        if proof.snode_version_major < required {
            return Err(QuorumCopError::OutdatedVersion {
                major: proof.snode_version_major,
                required,
            });
        }

        let recent = self.read_state(|state| {
            state
                .uptime_proof_seen
                .get(&proof.pubkey)
                .map_or(false, |&seen| {
                    seen >= now.saturating_sub(UPTIME_PROOF_FREQUENCY_IN_SECONDS / 2)
                })
        });
        if recent {
            return Err(QuorumCopError::TooFrequent(proof.pubkey));
        }

        let hash = self.proof_hash(&proof.pubkey, proof.timestamp);
        if !self
            .crypto
            .check_signature(&hash, &proof.pubkey, &proof.signature)
        {
            return Err(QuorumCopError::InvalidSignature);
        }

        self.with_state(|state| state.uptime_proof_seen.insert(proof.pubkey, now));
        debug!(key = %proof.pubkey, timestamp = proof.timestamp, "Accepted uptime proof");
        Ok(())
    }

    fn generate_uptime_proof(&self) -> QuorumCopResult<UptimeProof> {
        let keys = self
            .keys
            .as_ref()
            .ok_or(QuorumCopError::NoServiceNodeKeys)?;
        let timestamp = self.time_source.now();
        let hash = self.proof_hash(&keys.public_key, timestamp);
        let signature = self
            .crypto
            .generate_signature(&hash, &keys.public_key, &keys.secret_key)
            .ok_or(QuorumCopError::SigningFailed)?;
        Ok(UptimeProof {
            pubkey: keys.public_key,
            timestamp,
            signature,
            snode_version_major: SERVICE_NODE_VERSION[0],
            snode_version_minor: SERVICE_NODE_VERSION[1],
            snode_version_patch: SERVICE_NODE_VERSION[2],
        })
    }

    fn prune_uptime_proofs(&self) -> usize {
        let cutoff = self
            .time_source
            .now()
            .saturating_sub(UPTIME_PROOF_MAX_TIME_IN_SECONDS);
        self.with_state(|state| {
            let before = state.uptime_proof_seen.len();
            state.uptime_proof_seen.retain(|_, seen| *seen >= cutoff);
            before - state.uptime_proof_seen.len()
        })
    }

    fn last_uptime_proof(&self, pubkey: &PublicKey) -> Option<u64> {
        self.read_state(|state| state.uptime_proof_seen.get(pubkey).copied())
    }

    fn last_height(&self) -> u64 {
        self.read_state(|state| state.last_height)
    }
}

impl<B, C, Q, V> InitHook for QuorumCop<B, C, Q, V>
where
    B: BlockchainReader,
    C: CryptoProvider,
    Q: QuorumStateSource,
    V: VoteSubmitter,
{
    fn init(&self) {
        self.with_state(|state| {
            state.last_height = 0;
            state.retry.clear();
        });
    }
}

impl<B, C, Q, V> BlockAddedHook for QuorumCop<B, C, Q, V>
where
    B: BlockchainReader,
    C: CryptoProvider,
    Q: QuorumStateSource,
    V: VoteSubmitter,
{
    fn block_added(&self, block: &Block, _txs: &[Transaction]) {
        self.run_duties(block);
    }
}

impl<B, C, Q, V> BlockchainDetachedHook for QuorumCop<B, C, Q, V>
where
    B: BlockchainReader,
    C: CryptoProvider,
    Q: QuorumStateSource,
    V: VoteSubmitter,
{
    fn blockchain_detached(&self, height: u64) {
        self.with_state(|state| {
            if state.last_height >= height {
                error!(
                    height,
                    last_height = state.last_height,
                    "Reorg deeper than the judging safety buffer"
                );
                state.last_height = height;
            }
            let _ = state.retry.split_off(&(height, 0));
        });
    }
}
