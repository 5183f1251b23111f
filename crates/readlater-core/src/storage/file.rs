//! JSON file store
//!
//! Persists the whole namespace as one JSON object and writes it atomically
//! (write to a uniquely named temp file, then rename) so a reader never sees a
//! partial `set`, even with several processes writing.
//!
//! A store file that is not a JSON object is moved aside to
//! `storage.json.corrupt.backup` and the store continues empty.
//!
//! Storage location: `<data_dir>/storage.json` (see `Config::store_path`)
//!
//! Writes made through this handle notify its subscribers immediately. Writes
//! made by other processes are picked up by `poll_external_changes`, which
//! diffs the file against the contents this handle saw last.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{
    diff_keys, ChangeNotifier, ChangeSet, KeyValueStore, Patch, Snapshot, StorageError,
    StorageKey, StorageResult, Subscription,
};

/// Key-value store backed by a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Known-key values as of the last read or write through this handle
    last_seen: Mutex<BTreeMap<StorageKey, Value>>,
    notifier: ChangeNotifier,
}

impl JsonFileStore {
    /// Open a store file, creating nothing until the first write
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let document = read_document(&path)?;
        Ok(Self {
            last_seen: Mutex::new(known_values(&document)),
            path,
            notifier: ChangeNotifier::new(),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the backing file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the backing file in bytes (0 when missing)
    pub fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Detect writes made by other processes since this handle last looked
    ///
    /// Changed keys are broadcast to subscribers and returned.
    pub fn poll_external_changes(&self) -> StorageResult<ChangeSet> {
        let mut last_seen = self.last_seen.lock().map_err(|_| StorageError::Poisoned)?;
        let current = known_values(&read_document(&self.path)?);
        let changes = diff_keys(&last_seen, &current);

        if !changes.is_empty() {
            debug!("Detected external change to {} key(s) in {:?}", changes.len(), self.path);
            *last_seen = current;
            self.notifier.notify(changes.clone());
        }

        Ok(changes)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: &[StorageKey]) -> StorageResult<Snapshot> {
        let document = read_document(&self.path)?;
        let selected = keys
            .iter()
            .filter_map(|key| document.get(key.as_str()).map(|v| (*key, v.clone())))
            .collect();
        Ok(Snapshot::from_values(selected))
    }

    fn set(&self, patch: Patch) -> StorageResult<()> {
        // Hold the lock across read-merge-write so writes through this handle serialize
        let mut last_seen = self.last_seen.lock().map_err(|_| StorageError::Poisoned)?;

        let mut document = read_document(&self.path)?;
        let before = known_values(&document);
        for (key, value) in patch.into_values() {
            document.insert(key.as_str().to_string(), value);
        }
        let after = known_values(&document);

        let bytes = serde_json::to_vec_pretty(&Value::Object(document)).map_err(|source| {
            StorageError::Encode {
                key: "*".to_string(),
                source,
            }
        })?;
        atomic_write(&self.path, &bytes)?;

        // Changes made by others before this write are reported too
        let changes = diff_keys(&last_seen, &after);
        debug!(
            "Wrote {} key(s) to {:?} ({} changed since last read)",
            diff_keys(&before, &after).len(),
            self.path,
            changes.len()
        );
        *last_seen = after;
        self.notifier.notify(changes);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }
}

/// Read the store file as a JSON object; a missing or empty file is an empty object
///
/// A damaged file is backed up and read as empty.
fn read_document(path: &Path) -> StorageResult<Map<String, Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(StorageError::ReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    let details = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(_) => "expected a JSON object at the top level".to_string(),
        Err(e) => e.to_string(),
    };

    let backup = backup_path(path);
    fs::rename(path, &backup).map_err(|e| StorageError::from_io(e, backup.clone()))?;
    warn!(
        "Store file {:?} is corrupted ({}); moved it to {:?} and starting empty",
        path, details, backup
    );
    Ok(Map::new())
}

/// `<path>.corrupt.backup`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt.backup");
    PathBuf::from(name)
}

/// Values of the known keys; unknown keys stay in the file but are not tracked
fn known_values(document: &Map<String, Value>) -> BTreeMap<StorageKey, Value> {
    StorageKey::ALL
        .into_iter()
        .filter_map(|key| document.get(key.as_str()).map(|v| (key, v.clone())))
        .collect()
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;

    let mut temp =
        NamedTempFile::new_in(parent).map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
    let temp_path = temp.path().to_path_buf();
    temp.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    temp.persist(path)
        .map_err(|e| StorageError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}
