//! Device-local key-value storage
//!
//! The client keeps a handful of string values between runs: the bearer
//! token, cached list blobs, door statistics and app settings. Access is
//! synchronous; every mutation on a [`FileStore`] is written through to disk
//! by replacing the whole file, so a crash mid-write leaves the previous copy.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Key holding the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Key holding the cached access history
pub const ACCESS_RECORDS_CACHE_KEY: &str = "access_records_cache";
/// Key holding the cached card list
pub const CARDS_CACHE_KEY: &str = "cards_cache";
/// Key holding the remote-open statistics shown on the door screen
pub const DOOR_STATS_KEY: &str = "door_stats";
/// Namespaced settings key; survives logout
pub const APP_SETTINGS_KEY: &str = "app_settings";

/// Synchronous string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// List every stored key
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Remove every key except the ones listed in `preserved`
    fn clear_except(&self, preserved: &[&str]) -> StorageResult<()> {
        for key in self.keys()? {
            if !preserved.contains(&key.as_str()) {
                self.remove(&key)?;
            }
        }
        Ok(())
    }
}

fn poisoned() -> StorageError {
    StorageError::Unavailable("storage lock poisoned".to_string())
}

/// In-memory store, used by tests and as a fallback when no path is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().cloned().collect())
    }
}

/// Store persisted as a single JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };

        info!(
            "Opened local store at {} ({} keys)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to a sibling temp file and rename it over the target
    fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let raw = serde_json::to_vec_pretty(entries)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&raw)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        debug!("Flushed {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the entries and keep it only once it is on disk
    fn commit(&self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.commit(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().cloned().collect())
    }

    fn clear_except(&self, preserved: &[&str]) -> StorageResult<()> {
        self.commit(|entries| {
            entries.retain(|key, _| preserved.contains(&key.as_str()));
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        // Removing twice is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_clear_except_keeps_settings() {
        let store = MemoryStore::new();
        store.set(AUTH_TOKEN_KEY, "token").unwrap();
        store.set(CARDS_CACHE_KEY, "[]").unwrap();
        store.set(APP_SETTINGS_KEY, "{\"theme\":\"dark\"}").unwrap();

        store.clear_except(&[APP_SETTINGS_KEY]).unwrap();

        assert_eq!(store.keys().unwrap(), vec![APP_SETTINGS_KEY.to_string()]);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set(AUTH_TOKEN_KEY, "abc").unwrap();
            store.set(DOOR_STATS_KEY, "{}").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(AUTH_TOKEN_KEY).unwrap(), Some("abc".to_string()));
        assert_eq!(reopened.keys().unwrap().len(), 2);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_store_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set(AUTH_TOKEN_KEY, "abc").unwrap();
        store.set(AUTH_TOKEN_KEY, "def").unwrap();
        store.remove(AUTH_TOKEN_KEY).unwrap();
        store.set(APP_SETTINGS_KEY, "{}").unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.keys().collect::<Vec<_>>(), vec![APP_SETTINGS_KEY]);
    }

    #[test]
    fn test_failed_flush_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set(AUTH_TOKEN_KEY, "abc").unwrap();

        // A directory where the file should be makes the rename fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.set(AUTH_TOKEN_KEY, "def").is_err());
        assert!(store.set(CARDS_CACHE_KEY, "[]").is_err());
        assert!(store.clear_except(&[]).is_err());

        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), Some("abc".to_string()));
        assert_eq!(store.keys().unwrap(), vec![AUTH_TOKEN_KEY.to_string()]);
    }
}
