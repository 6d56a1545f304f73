//! # Shared Crypto - Cryptonote Primitives
//!
//! Backend for the service node crypto facade.
//!
//! ## Components
//!
//! | Module | Primitive | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, `Hs` | Registration/vote/proof hashes |
//! | `signatures` | Schnorr over Ed25519 | Registrations, votes, uptime proofs |
//! | `derivation` | ECDH + one-time keys | Stake auditing, miner tx payouts |
//! | `key_image` | `x·Hp(P)` + DLEQ proof | Stake locking and unlock requests |
//!
//! ## Security Properties
//!
//! - Deterministic nonces, no RNG dependency when signing
//! - Secret scalars must be canonical; non-canonical input is rejected
//! - Nonces are zeroized after use

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod derivation;
pub mod errors;
pub mod hashing;
pub mod key_image;
pub mod signatures;

// Re-exports
pub use derivation::{
    check_key, derive_public_key, derive_secret_key, derivation_to_scalar,
    deterministic_keypair_from_height, generate_key_derivation,
};
pub use errors::CryptoError;
pub use hashing::{cn_fast_hash, cn_fast_hash_many, hash_to_scalar, FastHasher};
pub use key_image::{check_key_image_proof, generate_key_image, generate_key_image_proof};
pub use signatures::{
    check_signature, generate_keys, generate_signature, keypair_from_seed,
    secret_key_to_public_key,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
