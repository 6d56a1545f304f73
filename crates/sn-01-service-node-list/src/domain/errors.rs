//! # Domain Errors
//!
//! Error types for the Service Node List subsystem.
//!
//! Transaction-level errors only skip the offending transaction. The
//! inconsistent-state class triggers a rebuild from the blockchain.

use shared_types::{AccountAddress, BlockchainError, PublicKey};
use thiserror::Error;

/// Service node list error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceNodeError {
    /// A transaction lacks a required extra field.
    #[error("Missing tx extra field: {0}")]
    MissingExtraField(&'static str),

    /// Portion and address lists differ in length or are empty.
    #[error("Portions/addresses mismatch: {portions} portions, {addresses} addresses")]
    PortionsMismatch {
        /// Number of portions
        portions: usize,
        /// Number of addresses
        addresses: usize,
    },

    /// Portions violate the per-slot minimum or exceed the total.
    #[error("Invalid portions")]
    InvalidPortions,

    /// Operator fee exceeds `STAKING_PORTIONS`.
    #[error("Operator portions too large: {0}")]
    OperatorPortionsTooLarge(u64),

    /// Signature does not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Bytes are not a valid public key.
    #[error("Invalid public key: {0}")]
    InvalidKey(PublicKey),

    /// Registration was mined after its expiration.
    #[error("Registration expired at {expiration}, block timestamp {block_timestamp}")]
    RegistrationExpired {
        /// Expiration timestamp
        expiration: u64,
        /// Block timestamp
        block_timestamp: u64,
    },

    /// Stake below the minimum contribution.
    #[error("Insufficient contribution: {transferred} < {minimum}")]
    InsufficientContribution {
        /// Amount decoded from the tx
        transferred: u64,
        /// Minimum for the slot
        minimum: u64,
    },

    /// More funders than allowed.
    #[error("Too many contributors: {0}")]
    TooManyContributors(usize),

    /// An address appears twice in a registration.
    #[error("Duplicate contributor address: {0}")]
    DuplicateAddress(AccountAddress),

    /// Registration for a key that is already registered.
    #[error("Service node already registered: {0}")]
    AlreadyRegistered(PublicKey),

    /// Key is not a registered node.
    #[error("Unknown service node: {0}")]
    UnknownServiceNode(PublicKey),

    /// Contribution to a node that needs no more stake.
    #[error("Service node already fully funded: {0}")]
    AlreadyFullyFunded(PublicKey),

    /// Contributor would exceed its locked key image allowance.
    #[error("Too many locked contributions for contributor {0}")]
    TooManyLockedContributions(AccountAddress),

    /// No cached quorum for a referenced height.
    #[error("Quorum state missing for height {0}")]
    MissingQuorumState(u64),

    /// Candidate index outside `nodes_to_test`.
    #[error("Service node index {index} out of bounds ({len})")]
    ServiceNodeIndexOutOfBounds {
        /// Index in the tx
        index: u32,
        /// Number of candidates
        len: usize,
    },

    /// Voter index outside `quorum_nodes`.
    #[error("Voter index {index} out of bounds ({len})")]
    VoterIndexOutOfBounds {
        /// Index in the vote
        index: u32,
        /// Quorum size
        len: usize,
    },

    /// A voter appears twice in a deregistration.
    #[error("Duplicate voter index: {0}")]
    DuplicateVoter(u32),

    /// Deregistration carries too few votes.
    #[error("Not enough votes: {got}/{required}")]
    NotEnoughVotes {
        /// Votes present
        got: usize,
        /// Votes required
        required: usize,
    },

    /// Deregistration refers to a height outside the accepted window.
    #[error("Deregistration height {height} outside window at height {current}")]
    DeregisterOutOfWindow {
        /// Quorum height in the tx
        height: u64,
        /// Current chain height
        current: u64,
    },

    /// Unlock requested for a node already unlocking.
    #[error("Unlock already requested for {0}")]
    UnlockAlreadyRequested(PublicKey),

    /// Key image is not locked in the node.
    #[error("Key image not locked by service node {0}")]
    KeyImageNotLocked(PublicKey),

    /// Block does not extend the tracked height.
    #[error("Block height {actual} does not match tracked height {expected}")]
    HeightMismatch {
        /// Height the registry expects next
        expected: u64,
        /// Height of the block
        actual: u64,
    },

    /// Rollback log cannot be replayed.
    #[error("Rollback failed: {0}")]
    RollbackFailed(String),

    /// Persisted blob cannot be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Host blockchain failed to serve blocks.
    #[error("Blockchain error: {0}")]
    Blockchain(#[from] BlockchainError),

    /// A domain invariant does not hold.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl ServiceNodeError {
    /// True for errors that mean local state no longer matches the chain.
    pub fn is_inconsistent_state(&self) -> bool {
        matches!(
            self,
            ServiceNodeError::MissingQuorumState(_)
                | ServiceNodeError::HeightMismatch { .. }
                | ServiceNodeError::RollbackFailed(_)
        )
    }
}

/// Errors from building a registration command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationCmdError {
    /// Wrong number of arguments.
    #[error("Usage: <operator cut> <address> <portions> [<address> <portions> [...]]")]
    Usage,

    /// More contributors than allowed.
    #[error("Exceeds the maximum number of contributors, which is {0}")]
    TooManyContributors(usize),

    /// A number failed to parse or is out of range.
    #[error("Invalid portion amount: {0}")]
    InvalidPortions(String),

    /// An address failed to parse.
    #[error("Failed to parse address: {0}")]
    InvalidAddress(String),

    /// An address appears twice.
    #[error("Duplicate address: {0}")]
    DuplicateAddress(String),

    /// A contributor's share is below its slot minimum or above what is left.
    #[error("Invalid amount for contributor {address}: {portions}, minimum {minimum}, remaining {remaining}")]
    InvalidContributorAmount {
        /// Contributor address
        address: String,
        /// Requested portions
        portions: u64,
        /// Minimum for the slot
        minimum: u64,
        /// Portions left to assign
        remaining: u64,
    },

    /// The node has no operating keys.
    #[error("This node has no service node keys")]
    NoServiceNodeKeys,

    /// Signing failed.
    #[error("Failed to sign registration")]
    SigningFailed,
}

/// Result alias for service node list operations.
pub type ServiceNodeResult<T> = Result<T, ServiceNodeError>;
