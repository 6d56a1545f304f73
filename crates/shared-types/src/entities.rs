//! # Core Domain Entities
//!
//! Chain data as the service node subsystems see it. Transaction extra
//! fields arrive already parsed by the host; amounts arrive already decoded.
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `Transaction`, `TxOutput`, `TxExtra`
//! - **Service node extras**: registration, deregistration, key image unlock
//! - **Network messages**: `UptimeProof`, `DeregisterVote`

use crate::primitives::{AccountAddress, Hash, KeyImage, PublicKey, SecretKey, Signature};
use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A block as delivered by the host blockchain.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Block {
    /// Height of this block.
    pub height: u64,
    /// Block id.
    pub hash: Hash,
    /// Id of the parent block.
    pub prev_hash: Hash,
    /// Unix timestamp set by the miner.
    pub timestamp: u64,
    /// Hard fork version this block was mined under.
    pub major_version: u8,
    /// Coinbase transaction.
    pub miner_tx: Transaction,
    /// Hashes of the non-coinbase transactions, in block order.
    pub tx_hashes: Vec<Hash>,
}

/// What a transaction does beyond moving funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TxType {
    /// Ordinary transfer; may carry a registration or a contribution.
    #[default]
    Standard,
    /// Quorum-approved removal of a service node.
    Deregister,
    /// Request to release a stake locked by key image.
    KeyImageUnlock,
}

/// A single transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxOutput {
    /// Decoded amount in atomic units.
    pub amount: u64,
    /// One-time output public key.
    pub key: PublicKey,
    /// Height (or timestamp, above `CRYPTONOTE_MAX_BLOCK_NUMBER`) before which it is unspendable.
    pub unlock_time: u64,
}

/// A transaction with its parsed extra fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Transaction {
    /// Transaction id.
    pub hash: Hash,
    /// Transaction kind.
    pub tx_type: TxType,
    /// Outputs in order.
    pub outputs: Vec<TxOutput>,
    /// Parsed extra fields.
    pub extra: TxExtra,
}

/// Parsed contents of a transaction's extra field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TxExtra {
    /// Transaction public key `R`.
    pub tx_public_key: Option<PublicKey>,
    /// Published transaction secret key, needed to audit a stake.
    pub tx_secret_key: Option<SecretKey>,
    /// Registration payload.
    pub service_node_register: Option<RegistrationExtra>,
    /// Service node the transaction refers to.
    pub service_node_pubkey: Option<PublicKey>,
    /// Address of the contributor funding the stake.
    pub service_node_contributor: Option<AccountAddress>,
    /// Block reward winner named by a miner transaction.
    pub service_node_winner: Option<PublicKey>,
    /// Deregistration payload.
    pub service_node_deregister: Option<DeregisterExtra>,
    /// Proofs of the key images of staked outputs.
    pub key_image_proofs: Vec<KeyImageProof>,
    /// Unlock request payload.
    pub key_image_unlock: Option<KeyImageUnlockExtra>,
}

// =============================================================================
// CLUSTER B: SERVICE NODE EXTRAS
// =============================================================================

/// Registration payload signed by the service node key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegistrationExtra {
    /// Reserved contributor addresses; the first one is the operator.
    pub addresses: Vec<AccountAddress>,
    /// Operator fee in portions.
    pub portions_for_operator: u64,
    /// Reserved portions per address.
    pub portions: Vec<u64>,
    /// Unix time after which the registration may no longer be mined.
    pub expiration_timestamp: u64,
    /// Signature by the service node key over the registration hash.
    pub signature: Signature,
}

/// A single quorum member's approval inside a deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisterVoteEntry {
    /// Position of the voter in the quorum.
    pub voters_quorum_index: u32,
    /// Voter's signature over the vote hash.
    pub signature: Signature,
}

/// Deregistration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeregisterExtra {
    /// Height of the quorum that judged the node.
    pub block_height: u64,
    /// Index of the node in that quorum's `nodes_to_test`.
    pub service_node_index: u32,
    /// Collected votes.
    pub votes: Vec<DeregisterVoteEntry>,
}

/// Ownership proof for the key image of a staked output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyImageProof {
    /// Key image of the staked output.
    pub key_image: KeyImage,
    /// Proof tying the key image to the output key.
    pub signature: Signature,
}

/// Unlock request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyImageUnlockExtra {
    /// Key image of the locked contribution.
    pub key_image: KeyImage,
    /// Request nonce.
    pub nonce: u32,
    /// Signature by the contribution's output key over the unlock hash.
    pub signature: Signature,
}

/// Split of a block reward, computed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockRewardParts {
    /// Amount paid to the miner.
    pub base_miner: u64,
    /// Amount paid to the winning service node and its contributors.
    pub service_node_total: u64,
}

// =============================================================================
// CLUSTER C: NETWORK MESSAGES
// =============================================================================

/// Liveness proof broadcast by a service node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimeProof {
    /// Node key.
    pub pubkey: PublicKey,
    /// Unix time the proof was made.
    pub timestamp: u64,
    /// Signature over the proof hash.
    pub signature: Signature,
    /// Software major version.
    pub snode_version_major: u16,
    /// Software minor version.
    pub snode_version_minor: u16,
    /// Software patch version.
    pub snode_version_patch: u16,
}

/// Vote by one quorum member to deregister one tested node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregisterVote {
    /// Height of the judging quorum.
    pub block_height: u64,
    /// Index into the quorum's `nodes_to_test`.
    pub service_node_index: u32,
    /// Index of the voter in the quorum's `quorum_nodes`.
    pub voters_quorum_index: u32,
    /// Voter's signature over the vote hash.
    pub signature: Signature,
}

impl Transaction {
    /// True for a `Deregister` transaction.
    pub fn is_deregister(&self) -> bool {
        self.tx_type == TxType::Deregister
    }
}
