//! # Blockchain Hooks
//!
//! Callbacks the host blockchain raises into subscribed subsystems. The host
//! serializes block application, so implementations see hooks in chain order.

use crate::entities::{Block, BlockRewardParts, Transaction};
use crate::primitives::Hash;

/// Called once at startup after the chain is loaded.
pub trait InitHook: Send + Sync {
    /// Load or rebuild subsystem state.
    fn init(&self);
}

/// Called after a block is appended to the main chain.
pub trait BlockAddedHook: Send + Sync {
    /// Apply the block and its non-coinbase transactions (in block order).
    fn block_added(&self, block: &Block, txs: &[Transaction]);
}

/// Called when blocks at and above `height` are popped during a reorg.
pub trait BlockchainDetachedHook: Send + Sync {
    /// Undo state derived from the popped blocks.
    fn blockchain_detached(&self, height: u64);
}

/// Pull-style check of the coinbase against subsystem rules.
pub trait ValidateMinerTxHook: Send + Sync {
    /// Returns false if the miner transaction must fail block validation.
    fn validate_miner_tx(
        &self,
        prev_id: &Hash,
        miner_tx: &Transaction,
        height: u64,
        hf_version: u8,
        reward_parts: &BlockRewardParts,
    ) -> bool;
}
