//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Bytes do not decode to a curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Bytes are not a canonical scalar
    #[error("Invalid secret key")]
    InvalidSecretKey,

    /// Bytes do not decode to a key image
    #[error("Invalid key image")]
    InvalidKeyImage,

    /// Signature halves are not canonical scalars
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}
