//! # Key Derivation
//!
//! One-time output keys from a shared secret.
//!
//! ```text
//! D = 8·r·A                  (sender)  ==  8·a·R  (recipient)
//! P_i = Hs(D ‖ varint(i))·G + B
//! x_i = Hs(D ‖ varint(i)) + b
//! ```

use crate::hashing::hash_to_scalar;
use crate::signatures::{decompress, secret_scalar};
use crate::CryptoError;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use shared_types::{KeyDerivation, PublicKey, SecretKey};

fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// `Hs(D ‖ varint(index))`.
pub fn derivation_to_scalar(derivation: &KeyDerivation, output_index: u64) -> Scalar {
    let mut buf = Vec::with_capacity(32 + 10);
    buf.extend_from_slice(derivation.as_bytes());
    write_varint(output_index, &mut buf);
    hash_to_scalar(&[buf.as_slice()])
}

/// Shared secret `8·secret·public`.
pub fn generate_key_derivation(
    public: &PublicKey,
    secret: &SecretKey,
) -> Result<KeyDerivation, CryptoError> {
    let point = decompress(public)?;
    let scalar = secret_scalar(secret)?;
    Ok(KeyDerivation(
        (scalar * point).mul_by_cofactor().compress().to_bytes(),
    ))
}

/// One-time public key of output `output_index` for spend key `base`.
pub fn derive_public_key(
    derivation: &KeyDerivation,
    output_index: u64,
    base: &PublicKey,
) -> Result<PublicKey, CryptoError> {
    let base = decompress(base)?;
    let scalar = derivation_to_scalar(derivation, output_index);
    Ok(PublicKey(
        (EdwardsPoint::mul_base(&scalar) + base).compress().to_bytes(),
    ))
}

/// One-time secret key of output `output_index` for spend secret `base`.
pub fn derive_secret_key(
    derivation: &KeyDerivation,
    output_index: u64,
    base: &SecretKey,
) -> Result<SecretKey, CryptoError> {
    let base = secret_scalar(base)?;
    let scalar = derivation_to_scalar(derivation, output_index);
    Ok(SecretKey((scalar + base).to_bytes()))
}

/// Keypair every node derives identically for a block height.
///
/// Used as the transaction key of miner outputs paying service nodes.
pub fn deterministic_keypair_from_height(height: u64) -> (PublicKey, SecretKey) {
    let scalar = hash_to_scalar(&[&height.to_le_bytes()[..]]);
    let public = EdwardsPoint::mul_base(&scalar).compress();
    (PublicKey(public.to_bytes()), SecretKey(scalar.to_bytes()))
}

/// True if the bytes decode to a curve point.
pub fn check_key(key: &PublicKey) -> bool {
    CompressedEdwardsY(key.0).decompress().is_some()
}
