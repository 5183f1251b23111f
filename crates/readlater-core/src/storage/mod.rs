//! Storage layer
//!
//! The persistent store is a flat key-value namespace shared by every surface.
//! Values are JSON; `Snapshot` and `Patch` give typed access to the four keys.
//!
//! ## Contract
//!
//! - `get` returns the last written value for each requested key (absent keys are absent)
//! - `set` merges every key of a patch in one step; no reader ever sees half a patch
//! - `subscribe` yields a `ChangeSet` after every `set` that changed something,
//!   no matter which surface wrote it
//!
//! Dropping a `Subscription` unsubscribes.
//!
//! ## Backends
//!
//! - `MemoryStore`: shared in-process state, used by tests and embedded surfaces
//! - `JsonFileStore`: a single JSON file, shared between processes

pub mod error;
pub mod file;
pub mod memory;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::models::{ReadingItem, ReadingProgress};

pub use error::{StorageError, StorageResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Capacity of the change notification channel per store
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Keys of the persisted namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    /// Backing list of saved links
    ReadLaterLinks,
    /// Ordered category names, sentinel first
    ReadLaterCategories,
    /// Category filter last chosen in the popup
    LastSelectedCategory,
    /// Scroll position of the highlight feature
    ReadingProgress,
}

impl StorageKey {
    /// Every key in the namespace
    pub const ALL: [StorageKey; 4] = [
        StorageKey::ReadLaterLinks,
        StorageKey::ReadLaterCategories,
        StorageKey::LastSelectedCategory,
        StorageKey::ReadingProgress,
    ];

    /// Name of the key as stored
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::ReadLaterLinks => "readLaterLinks",
            StorageKey::ReadLaterCategories => "readLaterCategories",
            StorageKey::LastSelectedCategory => "lastSelectedCategory",
            StorageKey::ReadingProgress => "readingProgress",
        }
    }

    /// Look up a key by its stored name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of keys changed by one `set` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    keys: BTreeSet<StorageKey>,
}

impl ChangeSet {
    pub fn new(keys: impl IntoIterator<Item = StorageKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn contains(&self, key: StorageKey) -> bool {
        self.keys.contains(&key)
    }

    /// Whether the change affects the reading list or the category registry
    pub fn touches_library(&self) -> bool {
        self.contains(StorageKey::ReadLaterLinks) || self.contains(StorageKey::ReadLaterCategories)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = StorageKey> + '_ {
        self.keys.iter().copied()
    }
}

/// Values read from the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<StorageKey, Value>,
}

impl Snapshot {
    pub(crate) fn from_values(values: BTreeMap<StorageKey, Value>) -> Self {
        Self { values }
    }

    /// Raw JSON value for a key
    pub fn raw(&self, key: StorageKey) -> Option<&Value> {
        self.values.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The stored reading list, if present and readable
    ///
    /// Items are decoded one by one: an unreadable record is dropped and the
    /// rest of the list survives. Untitled records take their URL as title.
    pub fn links(&self) -> Option<Vec<ReadingItem>> {
        let key = StorageKey::ReadLaterLinks;
        let value = self.values.get(&key)?;
        if value.is_null() {
            return None;
        }
        let Some(records) = value.as_array() else {
            warn!("Ignoring unreadable value for {}: expected an array", key);
            return None;
        };

        let items = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                match serde_json::from_value::<ReadingItem>(record.clone()) {
                    Ok(mut item) => {
                        if item.title.trim().is_empty() {
                            item.title = item.url.clone();
                        }
                        Some(item)
                    }
                    Err(e) => {
                        warn!("Dropping unreadable record {} of {}: {}", index, key, e);
                        None
                    }
                }
            })
            .collect();
        Some(items)
    }

    /// The stored category names, if present and readable
    pub fn categories(&self) -> Option<Vec<String>> {
        self.decode(StorageKey::ReadLaterCategories)
    }

    pub fn last_selected_category(&self) -> Option<String> {
        self.decode(StorageKey::LastSelectedCategory)
    }

    pub fn reading_progress(&self) -> Option<ReadingProgress> {
        self.decode(StorageKey::ReadingProgress)
    }

    /// Decode a value, treating unreadable data as absent
    fn decode<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let value = self.values.get(&key)?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Ignoring unreadable value for {}: {}", key, e);
                None
            }
        }
    }
}

/// A set of key/value writes committed by one `set` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    values: BTreeMap<StorageKey, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage any serializable value under a key
    pub fn put<T: Serialize + ?Sized>(&mut self, key: StorageKey, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    pub fn put_links(&mut self, links: &[ReadingItem]) -> StorageResult<()> {
        self.put(StorageKey::ReadLaterLinks, links)
    }

    pub fn put_categories(&mut self, categories: &[String]) -> StorageResult<()> {
        self.put(StorageKey::ReadLaterCategories, categories)
    }

    pub fn put_last_selected_category(&mut self, category: &str) -> StorageResult<()> {
        self.put(StorageKey::LastSelectedCategory, category)
    }

    pub fn put_reading_progress(&mut self, progress: &ReadingProgress) -> StorageResult<()> {
        self.put(StorageKey::ReadingProgress, progress)
    }

    pub fn contains(&self, key: StorageKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = StorageKey> + '_ {
        self.values.keys().copied()
    }

    pub(crate) fn into_values(self) -> BTreeMap<StorageKey, Value> {
        self.values
    }
}

/// Receiver of change notifications; drop it to unsubscribe
pub type Subscription = broadcast::Receiver<ChangeSet>;

/// The persistent key-value store shared by all surfaces
pub trait KeyValueStore: Send + Sync {
    /// Read the given keys
    fn get(&self, keys: &[StorageKey]) -> StorageResult<Snapshot>;

    /// Merge every key of `patch` in one atomic write
    fn set(&self, patch: Patch) -> StorageResult<()>;

    /// Subscribe to change notifications from every writer
    fn subscribe(&self) -> Subscription;
}

/// Fan-out of change notifications to subscribers
#[derive(Debug, Clone)]
pub(crate) struct ChangeNotifier {
    tx: broadcast::Sender<ChangeSet>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    /// Notify subscribers; a change nobody listens to is not an error
    pub(crate) fn notify(&self, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        let _ = self.tx.send(changes);
    }
}

/// Keys whose value in `next` differs from `previous`
pub(crate) fn diff_keys(
    previous: &BTreeMap<StorageKey, Value>,
    next: &BTreeMap<StorageKey, Value>,
) -> ChangeSet {
    ChangeSet::new(
        StorageKey::ALL
            .into_iter()
            .filter(|key| previous.get(key) != next.get(key)),
    )
}
