//! # Schnorr Signatures
//!
//! Cryptonote-style signatures over the Ed25519 group.
//!
//! ## Scheme
//!
//! - `k = Hs(sec ‖ hash)` (deterministic nonce, no RNG dependency)
//! - `c = Hs(hash ‖ pub ‖ k·G)`, `r = k − c·sec`
//! - Signature bytes are `c ‖ r`; verification recomputes `c` from `c·P + r·G`.

use crate::hashing::hash_to_scalar;
use crate::CryptoError;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use shared_types::{Hash, PublicKey, SecretKey, Signature};
use zeroize::Zeroize;

pub(crate) fn secret_scalar(sec: &SecretKey) -> Result<Scalar, CryptoError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(sec.0)).ok_or(CryptoError::InvalidSecretKey)
}

pub(crate) fn decompress(key: &PublicKey) -> Result<EdwardsPoint, CryptoError> {
    CompressedEdwardsY(key.0)
        .decompress()
        .ok_or(CryptoError::InvalidPublicKey)
}

pub(crate) fn split_signature(sig: &Signature) -> Result<(Scalar, Scalar), CryptoError> {
    let mut c = [0u8; 32];
    let mut r = [0u8; 32];
    c.copy_from_slice(&sig.0[..32]);
    r.copy_from_slice(&sig.0[32..]);
    let c = Option::<Scalar>::from(Scalar::from_canonical_bytes(c));
    let r = Option::<Scalar>::from(Scalar::from_canonical_bytes(r));
    match (c, r) {
        (Some(c), Some(r)) => Ok((c, r)),
        _ => Err(CryptoError::InvalidSignatureFormat),
    }
}

pub(crate) fn join_signature(c: &Scalar, r: &Scalar) -> Signature {
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(c.as_bytes());
    out[32..].copy_from_slice(r.as_bytes());
    Signature(out)
}

/// Public key of a secret scalar.
pub fn secret_key_to_public_key(sec: &SecretKey) -> Result<PublicKey, CryptoError> {
    let scalar = secret_scalar(sec)?;
    Ok(PublicKey(EdwardsPoint::mul_base(&scalar).compress().to_bytes()))
}

/// Generate random keypair.
pub fn generate_keys() -> (PublicKey, SecretKey) {
    let scalar = Scalar::random(&mut rand::thread_rng());
    let public = PublicKey(EdwardsPoint::mul_base(&scalar).compress().to_bytes());
    (public, SecretKey(scalar.to_bytes()))
}

/// Keypair whose secret is `Hs(seed)`.
pub fn keypair_from_seed(seed: &[u8]) -> (PublicKey, SecretKey) {
    let scalar = hash_to_scalar(&[seed]);
    let public = PublicKey(EdwardsPoint::mul_base(&scalar).compress().to_bytes());
    (public, SecretKey(scalar.to_bytes()))
}

/// Sign a prehashed message.
pub fn generate_signature(
    hash: &Hash,
    public: &PublicKey,
    secret: &SecretKey,
) -> Result<Signature, CryptoError> {
    let sec = secret_scalar(secret)?;
    let mut k = hash_to_scalar(&[secret.as_bytes(), hash.as_bytes()]);
    let commitment = EdwardsPoint::mul_base(&k).compress();
    let c = hash_to_scalar(&[hash.as_bytes(), public.as_bytes(), commitment.as_bytes()]);
    let r = k - c * sec;
    k.zeroize();
    Ok(join_signature(&c, &r))
}

/// Verify a signature over a prehashed message.
pub fn check_signature(
    hash: &Hash,
    public: &PublicKey,
    signature: &Signature,
) -> Result<(), CryptoError> {
    let point = decompress(public)?;
    let (c, r) = split_signature(signature)?;
    let commitment = EdwardsPoint::vartime_double_scalar_mul_basepoint(&c, &point, &r).compress();
    let expected = hash_to_scalar(&[hash.as_bytes(), public.as_bytes(), commitment.as_bytes()]);
    if expected == c {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::cn_fast_hash;

    #[test]
    fn test_sign_verify() {
        let (public, secret) = generate_keys();
        let hash = cn_fast_hash(b"Hello, service node!");

        let signature = generate_signature(&hash, &public, &secret).unwrap();
        assert!(check_signature(&hash, &public, &signature).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let (public, secret) = generate_keys();
        let signature = generate_signature(&cn_fast_hash(b"message1"), &public, &secret).unwrap();
        let result = check_signature(&cn_fast_hash(b"message2"), &public, &signature);
        assert_eq!(result, Err(CryptoError::SignatureVerificationFailed));
    }

    #[test]
    fn test_wrong_key_fails() {
        let (public1, secret1) = generate_keys();
        let (public2, _) = generate_keys();
        let hash = cn_fast_hash(b"test");

        let signature = generate_signature(&hash, &public1, &secret1).unwrap();
        assert!(check_signature(&hash, &public2, &signature).is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let (public, secret) = keypair_from_seed(b"deterministic test");
        let hash = cn_fast_hash(b"payload");

        let sig1 = generate_signature(&hash, &public, &secret).unwrap();
        let sig2 = generate_signature(&hash, &public, &secret).unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_public_key_matches_secret() {
        let (public, secret) = keypair_from_seed(b"seed");
        assert_eq!(secret_key_to_public_key(&secret).unwrap(), public);
    }

    #[test]
    fn test_non_canonical_secret_rejected() {
        let secret = SecretKey([0xff; 32]);
        assert_eq!(
            secret_key_to_public_key(&secret),
            Err(CryptoError::InvalidSecretKey)
        );
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let (public, _) = generate_keys();
        let result = check_signature(&cn_fast_hash(b"x"), &public, &Signature([0xff; 64]));
        assert_eq!(result, Err(CryptoError::InvalidSignatureFormat));
    }
}
