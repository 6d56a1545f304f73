//! # sn-01-service-node-list
//!
//! Service Node List subsystem: the registry of staked service nodes,
//! derived deterministically from the main chain.
//!
//! ## Architecture
//!
//! The list follows the host blockchain through three hooks from
//! `shared_types::hooks`:
//!
//! ```text
//! Blockchain ──init──────────────→ load persisted blob or rebuild
//!            ──block_added───────→ registrations, contributions, unlocks,
//!                                  deregistrations, expiry, reward rotation,
//!                                  swarms, quorum for the height
//!            ──blockchain_detached→ undo log, or rebuild past its horizon
//! ```
//!
//! Every node applying the same blocks arrives at the same list, the same
//! quorums and the same swarm assignments. All selection uses a ChaCha20
//! generator seeded from the block hash.
//!
//! ### Staking Eras
//!
//! Rules change with the hard fork version. `StakingPolicy` resolves them
//! once per block so the rest of the code never branches on versions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sn_01_service_node_list::{ServiceNodeList, ServiceNodeListDependencies, RegistryConfig};
//! use sn_01_service_node_list::adapters::{CurveCryptoProvider, InMemoryKVStore};
//!
//! let list = ServiceNodeList::new(ServiceNodeListDependencies {
//!     blockchain,
//!     crypto: Arc::new(CurveCryptoProvider::new()),
//!     store: Arc::new(InMemoryKVStore::new()),
//!     config: RegistryConfig::default(),
//! });
//! list.init();
//!
//! // Raised by the host for every main chain block.
//! list.block_added(&block, &txs);
//! let winner = list.winner();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod state;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export main types
pub use config::RegistryConfig;
pub use domain::{
    get_staking_requirement, KeyImageBlacklistEntry, NodeInfo, NodeListFilter, OwnStatus,
    QuorumState, RegistrationCmdError, ServiceNodeError, ServiceNodeKeys, ServiceNodePubkeyInfo,
    ServiceNodeResult, StakingEra, StakingPolicy,
};
pub use ports::{
    BlockchainReader, CryptoProvider, ServiceNodeListApi, ServiceNodeStore, TimeSource,
};
pub use service::{ServiceNodeList, ServiceNodeListDependencies, StakeContribution};
pub use state::RegistryState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
