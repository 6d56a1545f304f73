//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the Service Node List service.
//!
//! These are the interfaces the host node implements: the blockchain the
//! list follows, the crypto backend, the store for the persisted blob and
//! the wall clock.

use crate::domain::ServiceNodeResult;
use parking_lot::RwLock;
use shared_types::{
    Block, BlockchainError, Hash, KeyDerivation, KeyImage, PublicKey, SecretKey, Signature,
    Transaction,
};

/// A block with its non-coinbase transactions in block order.
pub type BlockEntry = (Block, Vec<Transaction>);

/// Read access to the host blockchain.
pub trait BlockchainReader: Send + Sync {
    /// Number of blocks in the main chain (height of the next block).
    fn current_height(&self) -> u64;

    /// Height the node is syncing towards; equal to `current_height` once synced.
    fn target_height(&self) -> u64 {
        self.current_height()
    }

    /// Hard fork version in force at `height`.
    fn hard_fork_version(&self, height: u64) -> u8;

    /// First height at which service nodes may exist.
    fn service_node_activation_height(&self) -> u64 {
        0
    }

    /// Up to `count` main chain blocks starting at `start`.
    fn blocks(&self, start: u64, count: u64) -> Result<Vec<BlockEntry>, BlockchainError>;
}

/// Crypto facade.
///
/// Production: `CurveCryptoProvider` (adapters/crypto.rs).
pub trait CryptoProvider: Send + Sync {
    /// Keccak-256 of `data`.
    fn fast_hash(&self, data: &[u8]) -> Hash;

    /// Public key of `secret`, if it is a valid scalar.
    fn secret_key_to_public_key(&self, secret: &SecretKey) -> Option<PublicKey>;

    /// Sign `hash`.
    fn generate_signature(
        &self,
        hash: &Hash,
        public: &PublicKey,
        secret: &SecretKey,
    ) -> Option<Signature>;

    /// Verify a signature over `hash`.
    fn check_signature(&self, hash: &Hash, public: &PublicKey, signature: &Signature) -> bool;

    /// Shared secret between a public and a secret key.
    fn generate_key_derivation(
        &self,
        public: &PublicKey,
        secret: &SecretKey,
    ) -> Option<KeyDerivation>;

    /// One-time output key for `output_index`.
    fn derive_public_key(
        &self,
        derivation: &KeyDerivation,
        output_index: u64,
        base: &PublicKey,
    ) -> Option<PublicKey>;

    /// Keypair every node derives for the miner tx at `height`.
    fn deterministic_keypair(&self, height: u64) -> (PublicKey, SecretKey);

    /// Verify that `key_image` belongs to `output_key`.
    fn check_key_image_proof(
        &self,
        output_key: &PublicKey,
        key_image: &KeyImage,
        proof: &Signature,
    ) -> bool;
}

/// Byte store for the persisted registry blob.
///
/// Production: the host database under a reserved key.
/// Testing: `InMemoryKVStore` (adapters/store.rs).
pub trait ServiceNodeStore: Send + Sync {
    /// Value under `key`.
    fn get(&self, key: &[u8]) -> ServiceNodeResult<Option<Vec<u8>>>;

    /// Replace the value under `key`.
    fn put(&self, key: &[u8], value: &[u8]) -> ServiceNodeResult<()>;

    /// Remove `key`.
    fn delete(&self, key: &[u8]) -> ServiceNodeResult<()>;
}

/// Wall clock.
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// Default time source using system time.
#[derive(Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// In-memory chain for testing.
///
/// Blocks are appended with `push` and popped with `pop_to`; the hook calls
/// are left to the test, as the host would raise them.
#[derive(Default)]
pub struct MockBlockchain {
    blocks: RwLock<Vec<BlockEntry>>,
    /// Version reported for heights without a block.
    pub default_hf_version: u8,
    /// Reported activation height.
    pub activation_height: u64,
    /// Reported sync target; `None` means synced.
    pub target: RwLock<Option<u64>>,
}

impl MockBlockchain {
    /// Empty chain reporting `hf_version` for unknown heights.
    pub fn new(hf_version: u8) -> Self {
        Self {
            default_hf_version: hf_version,
            ..Self::default()
        }
    }

    /// Append a block.
    pub fn push(&self, block: Block, txs: Vec<Transaction>) {
        self.blocks.write().push((block, txs));
    }

    /// Drop blocks at and above `height`.
    pub fn pop_to(&self, height: u64) {
        self.blocks.write().truncate(height as usize);
    }

    /// Block at `height`.
    pub fn block(&self, height: u64) -> Option<BlockEntry> {
        self.blocks.read().get(height as usize).cloned()
    }
}

impl BlockchainReader for MockBlockchain {
    fn current_height(&self) -> u64 {
        self.blocks.read().len() as u64
    }

    fn target_height(&self) -> u64 {
        self.target.read().unwrap_or_else(|| self.current_height())
    }

    fn hard_fork_version(&self, height: u64) -> u8 {
        self.blocks
            .read()
            .get(height as usize)
            .map(|(block, _)| block.major_version)
            .unwrap_or(self.default_hf_version)
    }

    fn service_node_activation_height(&self) -> u64 {
        self.activation_height
    }

    fn blocks(&self, start: u64, count: u64) -> Result<Vec<BlockEntry>, BlockchainError> {
        let blocks = self.blocks.read();
        if start > blocks.len() as u64 {
            return Err(BlockchainError::BlockNotFound(start));
        }
        let end = (start.saturating_add(count)).min(blocks.len() as u64);
        Ok(blocks[start as usize..end as usize].to_vec())
    }
}

/// Fixed clock for testing.
#[derive(Default)]
pub struct MockTimeSource {
    now: RwLock<u64>,
}

impl MockTimeSource {
    /// Clock stopped at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock.
    pub fn set(&self, now: u64) {
        *self.now.write() = now;
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> u64 {
        *self.now.read()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
