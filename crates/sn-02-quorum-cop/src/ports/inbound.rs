//! # Inbound Ports (Driving Ports)
//!
//! Uptime proof surface of the Quorum Cop. Voting duties run from the
//! blockchain hooks in `shared_types::hooks`.

use crate::domain::QuorumCopResult;
use shared_types::{PublicKey, UptimeProof};

/// Primary Quorum Cop API.
pub trait QuorumCopApi: Send + Sync {
    /// Validate a proof received from the network and record it.
    fn handle_uptime_proof(&self, proof: &UptimeProof) -> QuorumCopResult<()>;

    /// Build and sign this node's proof.
    fn generate_uptime_proof(&self) -> QuorumCopResult<UptimeProof>;

    /// Drop recorded proofs older than their lifetime; returns how many went.
    fn prune_uptime_proofs(&self) -> usize;

    /// Local arrival time of the last accepted proof from `pubkey`.
    fn last_uptime_proof(&self, pubkey: &PublicKey) -> Option<u64>;

    /// Next height the duty runner will judge.
    fn last_height(&self) -> u64;
}
