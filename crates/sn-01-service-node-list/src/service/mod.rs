//! Service Node List Service
//!
//! # Architecture
//! - Driven by the blockchain hooks; `block_added` is the only mutator
//!   besides `blockchain_detached`
//! - All mutable state lives in one `RegistryState` behind a reentrant lock
//! - The state borrow is never held across a blockchain or store call
//! - Inconsistent state is repaired by a deterministic rebuild

mod block;
mod command;
mod queries;
mod transactions;

#[cfg(test)]
mod tests;

pub use transactions::StakeContribution;

use crate::config::RegistryConfig;
use crate::domain::{
    ServiceNodeKeys, ServiceNodeResult, StakingPolicy, PERSISTED_STATE_VERSION,
    SERVICE_NODE_STATE_KEY,
};
use crate::ports::{
    BlockchainReader, CryptoProvider, ServiceNodeStore, SystemTimeSource, TimeSource,
};
use crate::state::{PersistedState, RegistryState};
use parking_lot::ReentrantMutex;
use shared_types::{
    Block, BlockAddedHook, BlockchainDetachedHook, InitHook, Transaction,
    HF_VERSION_SERVICE_NODES,
};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{error, info, warn};
use transactions::BlockContext;

/// Service Node List
///
/// Registry of staked service nodes derived from the main chain.
pub struct ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    blockchain: Arc<B>,
    crypto: Arc<C>,
    store: Arc<S>,
    config: RegistryConfig,
    keys: Option<ServiceNodeKeys>,
    time_source: Box<dyn TimeSource>,
    state: ReentrantMutex<RefCell<RegistryState>>,
}

/// Dependencies for ServiceNodeList
pub struct ServiceNodeListDependencies<B, C, S> {
    /// Host chain
    pub blockchain: Arc<B>,
    /// Crypto backend
    pub crypto: Arc<C>,
    /// Store for the persisted blob
    pub store: Arc<S>,
    /// Service configuration
    pub config: RegistryConfig,
}

impl<B, C, S> ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    /// Create a new ServiceNodeList. Call `init` before feeding blocks.
    pub fn new(deps: ServiceNodeListDependencies<B, C, S>) -> Self {
        Self {
            blockchain: deps.blockchain,
            crypto: deps.crypto,
            store: deps.store,
            config: deps.config,
            keys: None,
            time_source: Box::new(SystemTimeSource),
            state: ReentrantMutex::new(RefCell::new(RegistryState::default())),
        }
    }

    /// Set the operating keys of the local service node.
    pub fn with_keys(mut self, keys: ServiceNodeKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// Service configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Operating keys of the local node, if any.
    pub fn keys(&self) -> Option<&ServiceNodeKeys> {
        self.keys.as_ref()
    }

    /// Snapshot of the whole state.
    pub fn snapshot(&self) -> RegistryState {
        self.read_state(|state| state.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn read_state<R>(&self, f: impl FnOnce(&RegistryState) -> R) -> R {
        let guard = self.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    fn policy_at(&self, hf_version: u8) -> Option<StakingPolicy> {
        StakingPolicy::for_version(hf_version, self.config.network_type)
    }

    // === LIFECYCLE ===

    /// Load the persisted state, or rebuild it from the chain.
    ///
    /// Before the service node fork the state is reset and waits at the
    /// activation height.
    pub fn init(&self) {
        let current = self.blockchain.current_height();
        let top_version = match current {
            0 => 0,
            h => self.blockchain.hard_fork_version(h - 1),
        };
        if top_version < HF_VERSION_SERVICE_NODES {
            let start = self.blockchain.service_node_activation_height().max(current);
            self.with_state(|state| *state = RegistryState::new(start));
            info!(height = start, "Service nodes not active yet");
            return;
        }

        match self.load() {
            Ok(Some(loaded)) if loaded.height == current => {
                info!(
                    height = loaded.height,
                    nodes = loaded.infos.len(),
                    "Loaded service node list"
                );
                self.with_state(|state| *state = loaded);
            }
            Ok(Some(loaded)) => {
                warn!(
                    stored = loaded.height,
                    current, "Persisted service node list is stale, rebuilding"
                );
                self.rebuild();
            }
            Ok(None) => self.rebuild(),
            Err(e) => {
                error!(error = %e, "Failed to load service node list, rebuilding");
                self.rebuild();
            }
        }
    }

    /// Reset to the activation height and replay the chain.
    pub fn rebuild(&self) {
        let start = self.blockchain.service_node_activation_height();
        let end = self.blockchain.current_height();
        let batch_size = self.config.rebuild_batch_size.max(1);
        self.with_state(|state| *state = RegistryState::new(start));
        info!(start, end, "Rebuilding service node list");

        let mut height = start;
        while height < end {
            let batch = match self.blockchain.blocks(height, batch_size.min(end - height)) {
                Ok(batch) => batch,
                Err(e) => {
                    error!(height, error = %e, "Failed to fetch blocks for rebuild");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            for (block, txs) in &batch {
                if let Err(e) = self.apply_block(block, txs) {
                    error!(height = block.height, error = %e, "Error replaying block");
                }
            }
            height += batch.len() as u64;
        }

        self.persist_or_log();
    }

    fn apply_block(&self, block: &Block, txs: &[Transaction]) -> ServiceNodeResult<()> {
        let Some(policy) = self.policy_at(block.major_version) else {
            return self.with_state(|state| {
                if block.height == state.height {
                    state.height += 1;
                }
                Ok(())
            });
        };
        let ctx = BlockContext {
            crypto: &*self.crypto,
            policy,
            network: self.config.network_type,
            height: block.height,
            timestamp: block.timestamp,
        };
        let check_invariants = self.config.check_invariants;
        self.with_state(|state| ctx.process_block(state, block, txs, check_invariants))
    }

    // === PERSISTENCE ===

    fn load(&self) -> ServiceNodeResult<Option<RegistryState>> {
        let Some(bytes) = self.store.get(SERVICE_NODE_STATE_KEY)? else {
            return Ok(None);
        };
        let persisted = PersistedState::from_bytes(&bytes)?;
        if persisted.version != PERSISTED_STATE_VERSION {
            warn!(
                version = persisted.version,
                expected = PERSISTED_STATE_VERSION,
                "Persisted service node list has another version"
            );
            return Ok(None);
        }
        Ok(Some(persisted.into()))
    }

    /// Write the state blob to the store.
    pub fn persist(&self) -> ServiceNodeResult<()> {
        let bytes = self.read_state(|state| PersistedState::from(state).to_bytes())?;
        self.store.put(SERVICE_NODE_STATE_KEY, &bytes)
    }

    fn persist_or_log(&self) {
        if let Err(e) = self.persist() {
            error!(error = %e, "Failed to persist service node list");
        }
    }

    fn rollback(&self, height: u64) -> ServiceNodeResult<()> {
        self.with_state(|state| {
            if height >= state.height {
                return Ok(());
            }
            state.rollback_to(height)
        })
    }
}

impl<B, C, S> InitHook for ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    fn init(&self) {
        ServiceNodeList::init(self);
    }
}

impl<B, C, S> BlockAddedHook for ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    fn block_added(&self, block: &Block, txs: &[Transaction]) {
        match self.apply_block(block, txs) {
            Ok(()) => {}
            Err(e) if e.is_inconsistent_state() => {
                error!(height = block.height, error = %e, "Service node list inconsistent, rebuilding");
                self.rebuild();
                return;
            }
            Err(e) => error!(height = block.height, error = %e, "Error processing block"),
        }
        self.persist_or_log();
    }
}

impl<B, C, S> BlockchainDetachedHook for ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    fn blockchain_detached(&self, height: u64) {
        if let Err(e) = self.rollback(height) {
            error!(height, error = %e, "Rollback failed, rebuilding service node list");
            self.rebuild();
            return;
        }
        self.persist_or_log();
    }
}
