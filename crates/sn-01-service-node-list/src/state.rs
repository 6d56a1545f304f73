//! # Registry State
//!
//! The single owned state of the Service Node List and its undo log.

use crate::domain::{
    KeyImageBlacklistEntry, NodeInfo, QuorumState, RollbackEvent, ServiceNodeError,
    ServiceNodeResult, KEY_IMAGE_AWAITING_UNLOCK_HEIGHT, PERSISTED_STATE_VERSION,
    ROLLBACK_EVENT_EXPIRATION_BLOCKS,
};
use serde::{Deserialize, Serialize};
use shared_types::PublicKey;
use std::collections::{BTreeMap, VecDeque};

/// Everything the list derives from the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    /// Height of the next block to apply.
    pub height: u64,
    /// Registered nodes in key order.
    pub infos: BTreeMap<PublicKey, NodeInfo>,
    /// Undo log, oldest first.
    pub rollback_events: VecDeque<RollbackEvent>,
    /// Cached quorums by height.
    pub quorum_states: BTreeMap<u64, QuorumState>,
    /// Key images that may not be spent yet, sorted.
    pub key_image_blacklist: Vec<KeyImageBlacklistEntry>,
}

impl RegistryState {
    /// Empty state expecting block `height` next.
    pub fn new(height: u64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Drop undo records older than the retention window of `block_height`
    /// and mark the horizon.
    ///
    /// A marker already at or above the new horizon is kept, so replaying a
    /// block after a shallow reorg leaves the log unchanged.
    pub fn cull_rollback_events(&mut self, block_height: u64) {
        let cull_height = block_height.saturating_sub(ROLLBACK_EVENT_EXPIRATION_BLOCKS);
        while self
            .rollback_events
            .front()
            .map_or(false, |event| event.height() < cull_height)
        {
            self.rollback_events.pop_front();
        }
        match self.rollback_events.front() {
            Some(event) if event.is_prevent_beyond() && event.height() >= cull_height => {}
            _ => self.rollback_events.push_front(RollbackEvent::PreventBeyond {
                height: cull_height,
            }),
        }
    }

    /// Add `entry` to the blacklist; false if it was already present.
    pub fn blacklist_insert(&mut self, entry: KeyImageBlacklistEntry) -> bool {
        match self.key_image_blacklist.binary_search(&entry) {
            Ok(_) => false,
            Err(pos) => {
                self.key_image_blacklist.insert(pos, entry);
                true
            }
        }
    }

    /// Remove `entry` from the blacklist; false if it was absent.
    pub fn blacklist_remove(&mut self, entry: &KeyImageBlacklistEntry) -> bool {
        match self.key_image_blacklist.binary_search(entry) {
            Ok(pos) => {
                self.key_image_blacklist.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Undo every event at or above `height`.
    ///
    /// Fails if the log was pruned past `height` or an event does not match
    /// the state; the caller must then rebuild.
    pub fn rollback_to(&mut self, height: u64) -> ServiceNodeResult<()> {
        while self
            .rollback_events
            .back()
            .map_or(false, |event| event.height() >= height)
        {
            let Some(event) = self.rollback_events.pop_back() else {
                break;
            };
            match event {
                RollbackEvent::Change { key, info, .. } => {
                    self.infos.insert(key, *info);
                }
                RollbackEvent::New { key, .. } => {
                    if self.infos.remove(&key).is_none() {
                        return Err(ServiceNodeError::RollbackFailed(format!(
                            "new node {} not in list",
                            key
                        )));
                    }
                }
                RollbackEvent::PreventBeyond { height: horizon } => {
                    return Err(ServiceNodeError::RollbackFailed(format!(
                        "rollback to {} passes pruned horizon {}",
                        height, horizon
                    )));
                }
                RollbackEvent::KeyImageBlacklist {
                    entry, was_adding, ..
                } => {
                    if was_adding {
                        self.blacklist_remove(&entry);
                    } else {
                        self.blacklist_insert(entry);
                    }
                }
                RollbackEvent::KeyImageUnlock { key, .. } => match self.infos.get_mut(&key) {
                    Some(info) => info.requested_unlock_height = KEY_IMAGE_AWAITING_UNLOCK_HEIGHT,
                    None => {
                        return Err(ServiceNodeError::RollbackFailed(format!(
                            "unlocking node {} not in list",
                            key
                        )))
                    }
                },
            }
        }

        let _ = self.quorum_states.split_off(&height);
        self.height = height;
        Ok(())
    }
}

/// Persisted form of `RegistryState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// Blob layout version.
    pub version: u32,
    /// Height of the next block to apply.
    pub height: u64,
    /// Cached quorums.
    pub quorum_states: BTreeMap<u64, QuorumState>,
    /// Registered nodes.
    pub infos: BTreeMap<PublicKey, NodeInfo>,
    /// Undo log.
    pub events: VecDeque<RollbackEvent>,
    /// Key image blacklist.
    pub key_image_blacklist: Vec<KeyImageBlacklistEntry>,
}

impl PersistedState {
    /// Serialize with bincode.
    pub fn to_bytes(&self) -> ServiceNodeResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ServiceNodeError::Persistence(e.to_string()))
    }

    /// Deserialize with bincode.
    pub fn from_bytes(bytes: &[u8]) -> ServiceNodeResult<Self> {
        bincode::deserialize(bytes).map_err(|e| ServiceNodeError::Persistence(e.to_string()))
    }
}

impl From<&RegistryState> for PersistedState {
    fn from(state: &RegistryState) -> Self {
        Self {
            version: PERSISTED_STATE_VERSION,
            height: state.height,
            quorum_states: state.quorum_states.clone(),
            infos: state.infos.clone(),
            events: state.rollback_events.clone(),
            key_image_blacklist: state.key_image_blacklist.clone(),
        }
    }
}

impl From<PersistedState> for RegistryState {
    fn from(persisted: PersistedState) -> Self {
        Self {
            height: persisted.height,
            infos: persisted.infos,
            rollback_events: persisted.events,
            quorum_states: persisted.quorum_states,
            key_image_blacklist: persisted.key_image_blacklist,
        }
    }
}
