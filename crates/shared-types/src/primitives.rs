//! # Primitive Newtypes
//!
//! Fixed-size byte wrappers used throughout the service node subsystems.
//! Every type displays as lowercase hex and parses back from it.
//!
//! ## Types
//!
//! | Type | Size | Notes |
//! |------|------|-------|
//! | `Hash` | 32 | Keccak-256 "fast hash" output |
//! | `PublicKey` | 32 | Compressed Ed25519 point |
//! | `SecretKey` | 32 | Canonical scalar, zeroized on drop |
//! | `KeyImage` | 32 | Spend tag of a locked output |
//! | `KeyDerivation` | 32 | Shared secret between tx key and view key |
//! | `Signature` | 64 | `c ‖ r` Schnorr pair |

use crate::errors::ParseError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

fn decode_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let bytes = hex::decode(s).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ParseError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}

macro_rules! byte_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// All-zero value.
            pub const NULL: Self = Self([0u8; $len]);

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True if every byte is zero.
            pub fn is_null(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_hex::<$len>(s).map(Self)
            }
        }
    };
}

byte_newtype!(
    /// A 32-byte Keccak-256 hash.
    Hash,
    32
);

byte_newtype!(
    /// A 32-byte compressed curve point used as a public key.
    PublicKey,
    32
);

byte_newtype!(
    /// A key image: the one-time spend tag of an output.
    KeyImage,
    32
);

byte_newtype!(
    /// Shared secret derived from a transaction key and a view key.
    KeyDerivation,
    32
);

/// A 64-byte signature (`c ‖ r`).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] pub [u8; 64]);

impl Signature {
    /// All-zero signature.
    pub const NULL: Self = Self([0u8; 64]);

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl FromStr for Signature {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex::<64>(s).map(Self)
    }
}

/// A 32-byte secret scalar.
///
/// The bytes are wiped when the value is dropped and never printed.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(pub [u8; 32]);

impl SecretKey {
    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl FromStr for SecretKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex::<32>(s).map(Self)
    }
}

/// A wallet address: spend and view public keys.
///
/// Text form is 128 hex characters, spend key first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccountAddress {
    /// Public spend key.
    pub spend_public_key: PublicKey,
    /// Public view key.
    pub view_public_key: PublicKey,
}

impl AccountAddress {
    /// Address with both keys zeroed, used as the payee when nobody wins.
    pub const NULL: Self = Self {
        spend_public_key: PublicKey::NULL,
        view_public_key: PublicKey::NULL,
    };

    /// Build from both public keys.
    pub fn new(spend_public_key: PublicKey, view_public_key: PublicKey) -> Self {
        Self {
            spend_public_key,
            view_public_key,
        }
    }

    /// Canonical 64-byte encoding: spend key then view key.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.spend_public_key.0);
        out[32..].copy_from_slice(&self.view_public_key.0);
        out
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.spend_public_key, self.view_public_key)
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self)
    }
}

impl FromStr for AccountAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex::<64>(s)?;
        let mut spend = [0u8; 32];
        let mut view = [0u8; 32];
        spend.copy_from_slice(&bytes[..32]);
        view.copy_from_slice(&bytes[32..]);
        Ok(Self::new(PublicKey(spend), PublicKey(view)))
    }
}
