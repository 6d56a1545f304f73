//! # Keccak Hashing
//!
//! The "fast hash" (Keccak-256 with pre-SHA3 padding) and its reduction to a
//! curve scalar.

use curve25519_dalek::scalar::Scalar;
use sha3::{Digest, Keccak256};
use shared_types::Hash;

/// Stateful Keccak-256 hasher.
#[derive(Default, Clone)]
pub struct FastHasher {
    inner: Keccak256,
}

impl FastHasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        Hash(self.inner.finalize().into())
    }
}

/// Hash data with Keccak-256 (one-shot).
pub fn cn_fast_hash(data: &[u8]) -> Hash {
    Hash(Keccak256::digest(data).into())
}

/// Hash multiple inputs as one concatenated message.
pub fn cn_fast_hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = FastHasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize()
}

/// `Hs`: fast hash reduced modulo the group order.
pub fn hash_to_scalar(inputs: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order(cn_fast_hash_many(inputs).0)
}
