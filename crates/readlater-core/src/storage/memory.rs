//! In-memory store
//!
//! Clones share the same state and the same notification channel, so each
//! clone behaves like a separate surface attached to one browser profile.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{
    diff_keys, ChangeNotifier, KeyValueStore, Patch, Snapshot, StorageError, StorageKey,
    StorageResult, Subscription,
};

/// Shared in-memory key-value store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    values: Arc<Mutex<BTreeMap<StorageKey, Value>>>,
    notifier: ChangeNotifier,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(BTreeMap::new())),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.values.lock().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[StorageKey]) -> StorageResult<Snapshot> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        let selected = keys
            .iter()
            .filter_map(|key| values.get(key).map(|value| (*key, value.clone())))
            .collect();
        Ok(Snapshot::from_values(selected))
    }

    fn set(&self, patch: Patch) -> StorageResult<()> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;

        let mut next = values.clone();
        next.extend(patch.into_values());
        let changes = diff_keys(&values, &next);
        *values = next;

        // Notify while holding the lock so notifications arrive in write order
        self.notifier.notify(changes);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }
}
