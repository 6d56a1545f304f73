//! # Cross-Subsystem Scenarios
//!
//! A `Network` is one chain followed by the registry plus a quorum cop for
//! each live service node. All cops feed a single vote pool, standing in
//! for vote gossip between nodes.

pub mod lifecycle;
pub mod quorum_cop;
pub mod reorg;
pub mod stake_invariants;

use shared_types::{
    Block, BlockAddedHook, BlockchainDetachedHook, InitHook, PublicKey, Transaction,
};
use sn_01_service_node_list::adapters::CurveCryptoProvider;
use sn_01_service_node_list::ports::{MockBlockchain, MockTimeSource};
use sn_01_service_node_list::testing::{registration_tx, Registration, TestChain, TestWallet};
use sn_01_service_node_list::{QuorumState, ServiceNodeKeys, ServiceNodeListApi};
use sn_02_quorum_cop::ports::MockTxSink;
use sn_02_quorum_cop::{
    PoolVoteSubmitter, QuorumCop, QuorumCopApi, QuorumCopConfig, QuorumCopDependencies,
    QuorumStateSource,
};
use std::sync::{Arc, Once};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Wall clock shared by every cop.
pub const NOW: u64 = 1_600_000_000;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The fixture chain's registry, shared with the cops.
pub struct ChainQuorums(pub Arc<TestChain>);

impl QuorumStateSource for ChainQuorums {
    fn quorum_state(&self, height: u64) -> Option<QuorumState> {
        QuorumStateSource::quorum_state(&self.0.list, height)
    }

    fn is_service_node(&self, pubkey: &PublicKey) -> bool {
        QuorumStateSource::is_service_node(&self.0.list, pubkey)
    }
}

/// Vote pool shared by the cops.
pub type SharedPool =
    PoolVoteSubmitter<ChainQuorums, MockBlockchain, CurveCryptoProvider, MockTxSink>;

/// Quorum cop of one service node.
pub type Cop = QuorumCop<MockBlockchain, CurveCryptoProvider, ChainQuorums, SharedPool>;

/// Chain, registry, vote pool and cops.
pub struct Network {
    /// Chain and registry.
    pub chain: Arc<TestChain>,
    /// Vote pool every cop submits to.
    pub pool: Arc<SharedPool>,
    /// Deregistrations relayed by the pool.
    pub sink: Arc<MockTxSink>,
    /// Clock of every cop.
    pub clock: Arc<MockTimeSource>,
    /// Cops by node key.
    pub cops: Vec<(PublicKey, Cop)>,
}

impl Network {
    /// Empty network at `hf_version` with no cops yet.
    pub fn new(hf_version: u8) -> Self {
        init_tracing();
        let chain = Arc::new(TestChain::new(hf_version));
        let quorums = Arc::new(ChainQuorums(Arc::clone(&chain)));
        let sink = Arc::new(MockTxSink::default());
        let pool = Arc::new(PoolVoteSubmitter::new(
            quorums,
            Arc::clone(&chain.blockchain),
            Arc::new(CurveCryptoProvider::new()),
            Arc::clone(&sink),
        ));
        Self {
            chain,
            pool,
            sink,
            clock: Arc::new(MockTimeSource::new(NOW)),
            cops: Vec::new(),
        }
    }

    /// Start a cop for the node `keys` operates.
    pub fn start_cop(&mut self, keys: ServiceNodeKeys) {
        let key = keys.public_key;
        let cop = QuorumCop::new(QuorumCopDependencies {
            blockchain: Arc::clone(&self.chain.blockchain),
            crypto: Arc::new(CurveCryptoProvider::new()),
            quorums: Arc::new(ChainQuorums(Arc::clone(&self.chain))),
            submitter: Arc::clone(&self.pool),
            config: QuorumCopConfig::for_testing(),
        })
        .with_time_source(Box::new(Arc::clone(&self.clock)))
        .with_keys(keys);
        cop.init();
        self.cops.push((key, cop));
    }

    /// The cop of node `key`.
    pub fn cop(&self, key: &PublicKey) -> Option<&Cop> {
        self.cops.iter().find(|(k, _)| k == key).map(|(_, cop)| cop)
    }

    /// Every running cop announces itself and every cop hears every announcement.
    pub fn gossip_uptime_proofs(&self) {
        let proofs: Vec<_> = self
            .cops
            .iter()
            .filter_map(|(_, cop)| cop.generate_uptime_proof().ok())
            .collect();
        for (_, cop) in &self.cops {
            for proof in &proofs {
                if let Err(e) = cop.handle_uptime_proof(proof) {
                    debug!(key = %proof.pubkey, error = %e, "Uptime proof refused");
                }
            }
        }
    }

    /// Mine a block with `txs` and deliver it to the registry, the pool and the cops.
    pub fn add_block(&self, txs: Vec<Transaction>) -> Block {
        let block = self.chain.add_block(txs.clone());
        self.pool.block_added(&block, &txs);
        for (_, cop) in &self.cops {
            cop.block_added(&block, &txs);
        }
        block
    }

    /// Mine `count` empty blocks.
    pub fn add_empty_blocks(&self, count: u64) {
        for _ in 0..count {
            self.add_block(Vec::new());
        }
    }

    /// Pop blocks from `height` and notify everyone.
    pub fn detach(&self, height: u64) {
        self.chain.detach(height);
        for (_, cop) in &self.cops {
            cop.blockchain_detached(height);
        }
    }

    /// Register one solo node per seed, all in the next block.
    pub fn register_all(&self, seeds: std::ops::RangeInclusive<u32>) -> Vec<TestWallet> {
        let height = self.chain.height();
        let requirement = self.chain.list.staking_requirement(height);
        let wallets: Vec<TestWallet> = seeds.map(TestWallet::from_seed).collect();
        let txs = wallets
            .iter()
            .map(|wallet| {
                let registration =
                    Registration::solo(wallet, TestChain::timestamp(height) + 3_600);
                registration_tx(&registration, self.chain.policy(), height, requirement).tx
            })
            .collect();
        self.add_block(txs);
        wallets
    }
}
