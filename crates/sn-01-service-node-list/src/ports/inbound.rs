//! # Inbound Ports (Driving Ports)
//!
//! Query surface of the Service Node List. Block processing enters through
//! the hook traits in `shared_types::hooks`.

use crate::domain::{
    KeyImageBlacklistEntry, NodeListFilter, OwnStatus, QuorumState, RegistrationCmdError,
    ServiceNodePubkeyInfo, ServiceNodeResult,
};
use shared_types::{AccountAddress, KeyImage, PublicKey, Transaction};

/// Primary Service Node List API.
pub trait ServiceNodeListApi: Send + Sync {
    /// Height of the next block the list expects.
    fn height(&self) -> u64;

    /// Registered nodes matching `filter`, in key order.
    fn service_node_list_state(&self, filter: &NodeListFilter) -> Vec<ServiceNodePubkeyInfo>;

    /// Cached quorum state for `height`.
    fn quorum_state(&self, height: u64) -> Option<QuorumState>;

    /// Cached quorum states with `start <= height <= end`.
    fn quorum_states(&self, start: u64, end: u64) -> Vec<(u64, QuorumState)>;

    /// Current key image blacklist.
    fn key_image_blacklist(&self) -> Vec<KeyImageBlacklistEntry>;

    /// True if `pubkey` is registered.
    fn is_service_node(&self, pubkey: &PublicKey) -> bool;

    /// Registration status of this node; `None` without operating keys.
    fn own_status(&self) -> Option<OwnStatus>;

    /// Stake required to register at `height`.
    fn staking_requirement(&self, height: u64) -> u64;

    /// Node due the next block reward.
    fn winner(&self) -> PublicKey;

    /// Payees of the next block reward with their portions.
    fn winner_addresses_and_portions(&self) -> Vec<(AccountAddress, u64)>;

    /// Unlock height of a locked or blacklisted key image.
    ///
    /// `Some(KEY_IMAGE_AWAITING_UNLOCK_HEIGHT)` for a stake nobody asked to unlock.
    fn is_key_image_locked(&self, key_image: &KeyImage) -> Option<u64>;

    /// Validate a deregistration before it enters the pool or a block.
    fn check_deregister_tx(&self, tx: &Transaction, current_height: u64) -> ServiceNodeResult<()>;

    /// Build a signed `register_service_node` wallet command.
    fn make_registration_cmd(
        &self,
        args: &[String],
        make_friendly: bool,
    ) -> Result<String, RegistrationCmdError>;
}
