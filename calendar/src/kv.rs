// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::StoreError;

/// A string-to-string persistence medium with synchronous access.
///
/// Each call is atomic for its own key only; there are no transactions
/// spanning several keys.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-memory store, used by tests and as a scratch medium.
///
/// An optional quota bounds the total size of keys plus values in bytes,
/// the way browser storage does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Number of bytes currently held, counting keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();

        if let Some(quota) = self.quota {
            let used: usize = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
            let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
            let needed = used - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// File-backed store: the whole key space lives in one JSON object file.
///
/// The file is read once when the store is opened and rewritten after every
/// mutation. The in-memory view is rolled back when a write fails, so it
/// never runs ahead of what is on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; a file
    /// that does not hold a JSON object of strings is treated the same way,
    /// after being copied to `<file name>.bak`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = load_entries(&path)?;
        debug!("Opened storage file {} with {} keys", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        // Ensure the directory exists before saving the file
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let data = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let data = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_str(&data) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            // Keep a copy before the first write replaces it.
            let backup = backup_path(path);
            fs::copy(path, &backup).map_err(|source| StoreError::Io {
                path: backup.clone(),
                source,
            })?;
            warn!(
                "Storage file {} is not a JSON object of strings, starting empty (copy saved to {}): {}",
                path.display(),
                backup.display(),
                e
            );
            Ok(BTreeMap::new())
        }
    }
}

/// `<file name>.bak` next to the store file.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_get_set_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v2"));

        store.remove("k").unwrap();
        store.remove("k").unwrap(); // absent key is fine
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryStore::with_quota(10);
        store.set("ab", "12345678").unwrap(); // exactly 10 bytes
        assert_eq!(store.used_bytes(), 10);

        // Replacing the value with a shorter one frees room.
        store.set("ab", "1").unwrap();
        assert_eq!(store.used_bytes(), 3);

        let err = store.set("cd", "12345678").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { needed: 13, quota: 10, .. }));
        assert_eq!(store.get("cd"), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database").join("local_storage.json");

        // Act: open a missing file (and missing directory) and write to it
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("currentUser"), None);
        store.set("currentUser", "ada@example.com").unwrap();
        store.set("users", "[]").unwrap();
        store.remove("users").unwrap();

        // Assert: a fresh handle sees the same content
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("currentUser").as_deref(), Some("ada@example.com"));
        assert_eq!(reopened.get("users"), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_malformed_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local_storage.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything"), None);

        // The next write replaces the garbage with a valid file.
        store.set("k", "v").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").as_deref(), Some("v"));

        // The original contents were copied aside first.
        let backup = dir.path().join("local_storage.json.bak");
        assert_eq!(backup_path(&path), backup);
        assert_eq!(fs::read_to_string(&backup).unwrap(), "not json at all");
    }

    #[test]
    fn test_file_store_non_string_values_are_kept_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local_storage.json");
        let original = r#"{"calendarTasks_u_1":[{"id":1}],"currentUser":"u_1"}"#;
        fs::write(&path, original).unwrap();

        let store = FileStore::open(&path).unwrap();
        store.set("currentUser", "u_2").unwrap();

        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), original);
        assert_eq!(store.get("calendarTasks_u_1"), None);
    }

    #[test]
    fn test_file_store_failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes every rename fail.
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("child"), "x").unwrap();

        let store = FileStore {
            path: path.clone(),
            entries: RwLock::new(BTreeMap::new()),
        };

        let err = store.set("k", "v").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_shared_handles_see_the_same_data() {
        let store = Arc::new(MemoryStore::new());
        let other = Arc::clone(&store);

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").as_deref(), Some("v"));
        assert_eq!((&*store).get("k").as_deref(), Some("v"));
    }
}
