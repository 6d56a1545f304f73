//! # Portable Deterministic Randomness
//!
//! Quorum selection and swarm placement must agree bit for bit across every
//! node, so the generator, the uniform distribution and the shuffle are
//! pinned here and covered by fixed vectors.
//!
//! - Generator: ChaCha20 seeded with the little-endian `u64` of the first
//!   eight bytes of a block hash.
//! - Uniform: rejection sampling below `u64::MAX - u64::MAX % n`.
//! - Shuffle: Fisher-Yates from the front, `j = uniform(i + 1)`.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use shared_types::Hash;

/// Generator used by every consensus-relevant random choice.
pub type ServiceNodeRng = ChaCha20Rng;

/// Seed a generator from a block hash.
pub fn rng_from_hash(hash: &Hash) -> ServiceNodeRng {
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash.0[..8]);
    ChaCha20Rng::seed_from_u64(u64::from_le_bytes(seed))
}

/// Uniform value in `[0, n)`; `n == 0` yields 0.
pub fn uniform_distribution_portable<R: RngCore>(rng: &mut R, n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let secure_max = u64::MAX - u64::MAX % n;
    let mut x = rng.next_u64();
    while x >= secure_max {
        x = rng.next_u64();
    }
    x / (secure_max / n)
}

/// Shuffle `items` in place.
pub fn portable_shuffle<T, R: RngCore>(items: &mut [T], rng: &mut R) {
    for i in 1..items.len() {
        let j = uniform_distribution_portable(rng, (i + 1) as u64) as usize;
        items.swap(i, j);
    }
}
