//! # sn-02-quorum-cop
//!
//! Quorum Cop subsystem: liveness judging for service nodes.
//!
//! ## Architecture
//!
//! ```text
//! network ──UptimeProof──→ QuorumCop ──records arrival time
//! block_added ───────────→ QuorumCop ──DeregisterVote──→ PoolVoteSubmitter
//!                                                            │
//!                                  DeregisterVotePool ←──────┘
//!                                          │ 7 distinct voters
//!                                          ↓
//!                                  DeregisterTxSink (tx pool)
//! ```
//!
//! Each height is judged once it is `REORG_SAFETY_BUFFER_IN_BLOCKS` deep. A
//! tested node without a recorded uptime proof gets a vote from every quorum
//! member that runs a cop. The registry removes the node when the
//! deregistration is mined.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sn_02_quorum_cop::{QuorumCop, QuorumCopDependencies, QuorumCopConfig, PoolVoteSubmitter};
//!
//! let submitter = Arc::new(PoolVoteSubmitter::new(list.clone(), blockchain.clone(), crypto.clone(), tx_pool));
//! let cop = QuorumCop::new(QuorumCopDependencies {
//!     blockchain,
//!     crypto,
//!     quorums: list,
//!     submitter,
//!     config: QuorumCopConfig::default(),
//! })
//! .with_keys(keys);
//!
//! cop.handle_uptime_proof(&proof)?;
//! cop.block_added(&block, &txs);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::PoolVoteSubmitter;
pub use config::QuorumCopConfig;
pub use domain::{
    DeregisterVotePool, QuorumCopError, QuorumCopResult, VoteOutcome, VotePoolError,
};
pub use ports::{DeregisterTxSink, QuorumCopApi, QuorumStateSource, VoteSubmitter};
pub use service::{QuorumCop, QuorumCopDependencies};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
