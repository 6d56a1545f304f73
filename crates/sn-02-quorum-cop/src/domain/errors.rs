//! # Domain Errors
//!
//! Error types for the Quorum Cop subsystem.

use shared_types::PublicKey;
use sn_01_service_node_list::ServiceNodeError;
use thiserror::Error;

/// Quorum Cop error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumCopError {
    /// Proof timestamp too far from local time.
    #[error("Uptime proof timestamp {timestamp} outside window around {now}")]
    TimestampOutOfRange {
        /// Timestamp in the proof
        timestamp: u64,
        /// Local time
        now: u64,
    },

    /// Proof for a key that is not registered.
    #[error("Uptime proof for unknown service node: {0}")]
    UnknownServiceNode(PublicKey),

    /// Proof from software older than the active fork requires.
    #[error("Outdated service node version {major}, need {required}")]
    OutdatedVersion {
        /// Major version in the proof
        major: u16,
        /// Minimum for the active fork
        required: u16,
    },

    /// A proof from this key was accepted recently.
    #[error("Uptime proof from {0} received too recently")]
    TooFrequent(PublicKey),

    /// Signature does not verify.
    #[error("Invalid uptime proof signature")]
    InvalidSignature,

    /// This node has no operating keys.
    #[error("No service node keys configured")]
    NoServiceNodeKeys,

    /// Signing with the operating keys failed.
    #[error("Failed to sign with service node keys")]
    SigningFailed,

    /// No cached quorum for the height of a vote.
    #[error("No quorum state for height {0}")]
    MissingQuorumState(u64),

    /// The vote pool refused a vote.
    #[error("Vote pool error: {0}")]
    VotePool(#[from] VotePoolError),
}

/// Vote pool error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotePoolError {
    /// Vote for a height outside the voting window.
    #[error("Vote for height {height} outside window at {current}")]
    OutOfWindow {
        /// Height of the vote
        height: u64,
        /// Current chain height
        current: u64,
    },

    /// Vote fails verification against its quorum.
    #[error("Invalid vote: {0}")]
    InvalidVote(#[from] ServiceNodeError),
}

/// Result type for Quorum Cop operations.
pub type QuorumCopResult<T> = Result<T, QuorumCopError>;
