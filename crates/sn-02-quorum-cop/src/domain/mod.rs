//! # Domain Module
//!
//! Uptime proof rules and the deregistration vote pool.

pub mod errors;
pub mod vote_pool;

pub use errors::*;
pub use vote_pool::*;

/// Seconds an uptime proof timestamp may differ from local time.
pub const UPTIME_PROOF_BUFFER_IN_SECONDS: u64 = 5 * 60;

/// Seconds between proofs a node sends.
pub const UPTIME_PROOF_FREQUENCY_IN_SECONDS: u64 = 60 * 60;

/// Seconds a recorded proof stays valid.
pub const UPTIME_PROOF_MAX_TIME_IN_SECONDS: u64 =
    UPTIME_PROOF_FREQUENCY_IN_SECONDS * 2 + UPTIME_PROOF_BUFFER_IN_SECONDS;

/// Version this node reports in its uptime proofs.
pub const SERVICE_NODE_VERSION: [u16; 3] = [3, 0, 0];
