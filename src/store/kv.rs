//! Ambient key-value mirror
//!
//! A flat string-keyed persistent area separate from the collections,
//! used for the secret key, the store profile, and denormalized caches
//! of frequently-read data. Cache entries use the `cache.` prefix; a
//! quota-exceeded write evicts them once and retries.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use tracing::warn;

use crate::error::{VaultError, VaultResult};

use super::file_io::{read_json, write_json_atomic};

/// Prefix for evictable cache entries
pub const CACHE_PREFIX: &str = "cache.";

/// Reserved prefix for key material; entries under it never travel in
/// snapshots or exports
pub const SECRET_PREFIX: &str = "crypto.";

/// Flat string-keyed persistent store
pub struct KeyValueStore {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
    loaded: Mutex<bool>,
}

impl KeyValueStore {
    /// Create a key-value store backed by the given file
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(BTreeMap::new()),
            loaded: Mutex::new(false),
        }
    }

    /// Load contents from disk on first use
    fn ensure_loaded(&self) -> VaultResult<()> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire init lock: {}", e)))?;
        if *loaded {
            return Ok(());
        }

        let contents: BTreeMap<String, String> = read_json(&self.path)?;
        let mut data = self.write()?;
        *data = contents;
        *loaded = true;
        Ok(())
    }

    fn read(&self) -> VaultResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, String>>> {
        self.data
            .read()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> VaultResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>>> {
        self.data
            .write()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Get a value
    pub fn get(&self, key: &str) -> VaultResult<Option<String>> {
        self.ensure_loaded()?;
        let data = self.read()?;
        Ok(data.get(key).cloned())
    }

    /// Set a value, persisting immediately
    ///
    /// On a quota error the evictable cache entries are dropped and the
    /// write retried once; a second failure surfaces to the caller.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> VaultResult<()> {
        self.ensure_loaded()?;
        let key = key.into();
        let mut data = self.write()?;
        let previous = data.insert(key.clone(), value.into());

        match write_json_atomic(&self.path, &*data) {
            Ok(()) => Ok(()),
            Err(e) if e.is_quota() => {
                warn!("key-value write hit storage quota, evicting cache entries and retrying");
                data.retain(|k, _| !k.starts_with(CACHE_PREFIX));
                if let Err(retry_err) = write_json_atomic(&self.path, &*data) {
                    match previous {
                        Some(prev) => {
                            data.insert(key, prev);
                        }
                        None => {
                            data.remove(&key);
                        }
                    }
                    return Err(retry_err);
                }
                Ok(())
            }
            Err(e) => {
                match previous {
                    Some(prev) => {
                        data.insert(key, prev);
                    }
                    None => {
                        data.remove(&key);
                    }
                }
                Err(e)
            }
        }
    }

    /// Remove a key; returns whether it existed
    pub fn remove(&self, key: &str) -> VaultResult<bool> {
        self.ensure_loaded()?;
        let mut data = self.write()?;
        let previous = data.remove(key);
        let existed = previous.is_some();

        if existed {
            if let Err(e) = write_json_atomic(&self.path, &*data) {
                if let Some(prev) = previous {
                    data.insert(key.to_string(), prev);
                }
                return Err(e);
            }
        }
        Ok(existed)
    }

    /// Copy of every entry, for snapshots
    pub fn entries(&self) -> VaultResult<BTreeMap<String, String>> {
        self.ensure_loaded()?;
        let data = self.read()?;
        Ok(data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_kv() -> (TempDir, KeyValueStore) {
        let temp_dir = TempDir::new().unwrap();
        let kv = KeyValueStore::new(temp_dir.path().join("keyvalue.json"));
        (temp_dir, kv)
    }

    #[test]
    fn test_get_missing_key() {
        let (_temp, kv) = create_test_kv();
        assert!(kv.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let (_temp, kv) = create_test_kv();

        kv.set("store.name", "Corner Shop").unwrap();
        assert_eq!(kv.get("store.name").unwrap().as_deref(), Some("Corner Shop"));
    }

    #[test]
    fn test_persists_across_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keyvalue.json");

        let kv = KeyValueStore::new(path.clone());
        kv.set("a", "1").unwrap();

        let reopened = KeyValueStore::new(path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_remove() {
        let (_temp, kv) = create_test_kv();

        kv.set("a", "1").unwrap();
        assert!(kv.remove("a").unwrap());
        assert!(!kv.remove("a").unwrap());
        assert!(kv.get("a").unwrap().is_none());
    }

    #[test]
    fn test_entries_snapshot() {
        let (_temp, kv) = create_test_kv();

        kv.set("a", "1").unwrap();
        kv.set("b", "2").unwrap();

        let entries = kv.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("b").map(String::as_str), Some("2"));
    }
}
