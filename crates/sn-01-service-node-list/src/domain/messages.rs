//! # Signed Messages
//!
//! Byte layouts of the payloads that service nodes and stakers sign.
//! Each function returns the exact bytes handed to the fast hash, except
//! the unlock payload which is signed as is.

use shared_types::{AccountAddress, Hash};

/// Magic prefix of uptime proofs.
pub const UPTIME_PROOF_MAGIC: &[u8; 4] = b"SUP\0";

/// `addresses (spend || view) || operator portions || portions || expiration`.
pub fn registration_hash_input(
    addresses: &[AccountAddress],
    portions_for_operator: u64,
    portions: &[u64],
    expiration_timestamp: u64,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(addresses.len() * 64 + portions.len() * 8 + 16);
    for address in addresses {
        buf.extend_from_slice(&address.to_bytes());
    }
    buf.extend_from_slice(&portions_for_operator.to_le_bytes());
    for portion in portions {
        buf.extend_from_slice(&portion.to_le_bytes());
    }
    buf.extend_from_slice(&expiration_timestamp.to_le_bytes());
    buf
}

/// `block_height || service_node_index`.
pub fn vote_hash_input(block_height: u64, service_node_index: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12);
    buf.extend_from_slice(&block_height.to_le_bytes());
    buf.extend_from_slice(&service_node_index.to_le_bytes());
    buf
}

/// `"SUP\0" || pubkey || timestamp`.
pub fn uptime_proof_hash_input(pubkey: &[u8; 32], timestamp: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44);
    buf.extend_from_slice(UPTIME_PROOF_MAGIC);
    buf.extend_from_slice(pubkey);
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf
}

/// Unlock request payload: the nonce repeated to fill 32 bytes.
pub fn key_image_unlock_hash(nonce: u32) -> Hash {
    let mut bytes = [0u8; 32];
    for chunk in bytes.chunks_exact_mut(4) {
        chunk.copy_from_slice(&nonce.to_le_bytes());
    }
    Hash(bytes)
}
