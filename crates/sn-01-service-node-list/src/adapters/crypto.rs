//! # Crypto Adapter
//!
//! `CryptoProvider` backed by `shared-crypto`.

use crate::ports::CryptoProvider;
use shared_types::{Hash, KeyDerivation, KeyImage, PublicKey, SecretKey, Signature};

/// Curve25519 implementation of the crypto facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurveCryptoProvider;

impl CurveCryptoProvider {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for CurveCryptoProvider {
    fn fast_hash(&self, data: &[u8]) -> Hash {
        shared_crypto::cn_fast_hash(data)
    }

    fn secret_key_to_public_key(&self, secret: &SecretKey) -> Option<PublicKey> {
        shared_crypto::secret_key_to_public_key(secret).ok()
    }

    fn generate_signature(
        &self,
        hash: &Hash,
        public: &PublicKey,
        secret: &SecretKey,
    ) -> Option<Signature> {
        shared_crypto::generate_signature(hash, public, secret).ok()
    }

    fn check_signature(&self, hash: &Hash, public: &PublicKey, signature: &Signature) -> bool {
        shared_crypto::check_signature(hash, public, signature).is_ok()
    }

    fn generate_key_derivation(
        &self,
        public: &PublicKey,
        secret: &SecretKey,
    ) -> Option<KeyDerivation> {
        shared_crypto::generate_key_derivation(public, secret).ok()
    }

    fn derive_public_key(
        &self,
        derivation: &KeyDerivation,
        output_index: u64,
        base: &PublicKey,
    ) -> Option<PublicKey> {
        shared_crypto::derive_public_key(derivation, output_index, base).ok()
    }

    fn deterministic_keypair(&self, height: u64) -> (PublicKey, SecretKey) {
        shared_crypto::deterministic_keypair_from_height(height)
    }

    fn check_key_image_proof(
        &self,
        output_key: &PublicKey,
        key_image: &KeyImage,
        proof: &Signature,
    ) -> bool {
        shared_crypto::check_key_image_proof(output_key, key_image, proof).is_ok()
    }
}
