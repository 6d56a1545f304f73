//! # Adapters
//!
//! Concrete implementations of the outbound ports.

pub mod registry;
pub mod submitter;

pub use submitter::PoolVoteSubmitter;
