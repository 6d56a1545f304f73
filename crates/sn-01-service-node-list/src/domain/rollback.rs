//! # Rollback Events
//!
//! Undo log entries. Every mutation of consensus state pushes one event
//! stamped with the block height that caused it; a reorg pops and reverses
//! them newest first.

use super::entities::{KeyImageBlacklistEntry, NodeInfo};
use serde::{Deserialize, Serialize};
use shared_types::PublicKey;

/// A single undo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollbackEvent {
    /// `key` held `info` before the change.
    Change {
        /// Block height of the change
        height: u64,
        /// Node key
        key: PublicKey,
        /// Record before the change
        info: Box<NodeInfo>,
    },
    /// `key` was created at `height`.
    New {
        /// Block height of the registration
        height: u64,
        /// Node key
        key: PublicKey,
    },
    /// Events below `height` were pruned; rolling back past it needs a rebuild.
    PreventBeyond {
        /// Pruning horizon
        height: u64,
    },
    /// A blacklist entry was added (`was_adding`) or expired.
    KeyImageBlacklist {
        /// Block height of the change
        height: u64,
        /// Affected entry
        entry: KeyImageBlacklistEntry,
        /// True if the entry was added
        was_adding: bool,
    },
    /// `key` requested its stake unlock at `height`.
    KeyImageUnlock {
        /// Block height of the request
        height: u64,
        /// Node key
        key: PublicKey,
    },
}

impl RollbackEvent {
    /// Block height the event belongs to.
    pub fn height(&self) -> u64 {
        match self {
            RollbackEvent::Change { height, .. }
            | RollbackEvent::New { height, .. }
            | RollbackEvent::PreventBeyond { height }
            | RollbackEvent::KeyImageBlacklist { height, .. }
            | RollbackEvent::KeyImageUnlock { height, .. } => *height,
        }
    }

    /// Undo record for a node about to change.
    pub fn change(height: u64, key: PublicKey, info: &NodeInfo) -> Self {
        RollbackEvent::Change {
            height,
            key,
            info: Box::new(info.clone()),
        }
    }

    /// True for a pruning marker.
    pub fn is_prevent_beyond(&self) -> bool {
        matches!(self, RollbackEvent::PreventBeyond { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_of_each_variant() {
        let key = PublicKey([1; 32]);
        let info = NodeInfo::for_testing(10);
        assert_eq!(RollbackEvent::change(3, key, &info).height(), 3);
        assert_eq!(RollbackEvent::New { height: 4, key }.height(), 4);
        assert_eq!(RollbackEvent::PreventBeyond { height: 5 }.height(), 5);
        assert_eq!(RollbackEvent::KeyImageUnlock { height: 6, key }.height(), 6);
    }

    #[test]
    fn test_prevent_beyond_marker() {
        assert!(RollbackEvent::PreventBeyond { height: 0 }.is_prevent_beyond());
        assert!(!RollbackEvent::New {
            height: 0,
            key: PublicKey::NULL
        }
        .is_prevent_beyond());
    }
}
