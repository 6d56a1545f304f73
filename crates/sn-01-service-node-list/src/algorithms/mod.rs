//! # Algorithms Module
//!
//! Deterministic selection: quorums, reward winners and swarm placement.

pub mod prng;
pub mod quorum;
pub mod rewards;
pub mod swarm;

pub use prng::{portable_shuffle, rng_from_hash, uniform_distribution_portable, ServiceNodeRng};
pub use quorum::generate_quorum_state;
pub use rewards::{select_winner, winner_addresses_and_portions};
pub use swarm::{calc_swarm_changes, SwarmMap};
