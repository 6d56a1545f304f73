//! # Key Images
//!
//! `I = x·Hp(P)` where `P = x·G` is a one-time output key. `Hp` hashes the
//! output key into the Ristretto group, so a key image is a compressed
//! Ristretto point.
//!
//! A key image proof is a single-member ring signature: a discrete log
//! equality proof that `log_G(P) == log_Hp(P)(I)`.

use crate::hashing::hash_to_scalar;
use crate::signatures::{decompress, join_signature, secret_scalar, split_signature};
use crate::CryptoError;
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use sha2::Sha512;
use shared_types::{KeyImage, PublicKey, SecretKey, Signature};
use zeroize::Zeroize;

fn hash_to_point(key: &PublicKey) -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(key.as_bytes())
}

fn decompress_image(image: &KeyImage) -> Result<RistrettoPoint, CryptoError> {
    CompressedRistretto(image.0)
        .decompress()
        .ok_or(CryptoError::InvalidKeyImage)
}

fn challenge(
    public: &PublicKey,
    image: &KeyImage,
    base_commitment: &EdwardsPoint,
    image_commitment: &RistrettoPoint,
) -> curve25519_dalek::scalar::Scalar {
    hash_to_scalar(&[
        public.as_bytes(),
        image.as_bytes(),
        base_commitment.compress().as_bytes(),
        image_commitment.compress().as_bytes(),
    ])
}

/// Key image of the output key `public` owned by `secret`.
pub fn generate_key_image(public: &PublicKey, secret: &SecretKey) -> Result<KeyImage, CryptoError> {
    let scalar = secret_scalar(secret)?;
    Ok(KeyImage((scalar * hash_to_point(public)).compress().to_bytes()))
}

/// Prove that `image` belongs to `public`.
pub fn generate_key_image_proof(
    public: &PublicKey,
    secret: &SecretKey,
    image: &KeyImage,
) -> Result<Signature, CryptoError> {
    let x = secret_scalar(secret)?;
    let mut k = hash_to_scalar(&[b"key_image_proof", secret.as_bytes(), image.as_bytes()]);
    let base_commitment = EdwardsPoint::mul_base(&k);
    let image_commitment = k * hash_to_point(public);
    let c = challenge(public, image, &base_commitment, &image_commitment);
    let r = k - c * x;
    k.zeroize();
    Ok(join_signature(&c, &r))
}

/// Verify a key image proof.
pub fn check_key_image_proof(
    public: &PublicKey,
    image: &KeyImage,
    proof: &Signature,
) -> Result<(), CryptoError> {
    let point = decompress(public)?;
    let image_point = decompress_image(image)?;
    let (c, r) = split_signature(proof)?;

    let base_commitment = EdwardsPoint::vartime_double_scalar_mul_basepoint(&c, &point, &r);
    let image_commitment = r * hash_to_point(public) + c * image_point;
    if challenge(public, image, &base_commitment, &image_commitment) == c {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}
