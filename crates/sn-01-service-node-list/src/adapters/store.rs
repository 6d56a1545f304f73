//! # Store Adapter
//!
//! In-memory `ServiceNodeStore`.

use crate::domain::ServiceNodeResult;
use crate::ports::ServiceNodeStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory key-value store for tests and ephemeral nodes.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl ServiceNodeStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> ServiceNodeResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> ServiceNodeResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> ServiceNodeResult<()> {
        self.data.write().remove(key);
        Ok(())
    }
}
