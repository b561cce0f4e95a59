//! Key-value stores that back the fetch cache
//!
//! The fetcher only needs `get` and `set` on serialized strings, so any
//! backing medium can be plugged in through [`KeyValueStore`]. Two stores
//! ship with the crate: [`MemoryStore`] for process-local caching and tests,
//! and [`FileStore`], which keeps one JSON file per key on disk.

use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors raised by a backing store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the underlying medium failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized for storage
    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Cache lock poisoned")]
    Poisoned,
}

/// String key-value storage used by the fetcher
///
/// Payloads are opaque to the store; the fetcher serializes and parses them.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored string for `key`, or `None` if nothing is stored
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of successful `set` calls since creation
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Longest readable key prefix kept in a cache file name
const FILE_PREFIX_MAX_CHARS: usize = 48;

/// Stores each key as a JSON file in a cache directory
///
/// The default location is XDG-compliant (`~/.cache/autoapply/` on Linux).
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a store in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g. no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "autoapply")?;
        Some(Self {
            cache_dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the file path used for `key`
    ///
    /// The name is a short sanitized prefix of the key followed by the
    /// SHA-256 of the full key, so distinct keys never share a file and the
    /// name length is bounded whatever the key length.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let prefix: String = key
            .chars()
            .take(FILE_PREFIX_MAX_CHARS)
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.cache_dir.join(format!("{}-{}.json", prefix, sha256_hex(key)))
    }
}

/// Compute SHA-256 of `key`, returning a hex-encoded string.
fn sha256_hex(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        fs::create_dir_all(&self.cache_dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path());
        (store, temp_dir)
    }

    #[test]
    fn test_memory_store_get_missing_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_set_then_get() {
        let store = MemoryStore::new();
        store.set("jobs", "[1,2]".to_string()).unwrap();
        assert_eq!(store.get("jobs").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_memory_store_overwrite_counts_writes() {
        let store = MemoryStore::new();
        store.set("k", "a".to_string()).unwrap();
        store.set("k", "b".to_string()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn test_arc_store_delegates() {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<MemoryStore> = Arc::clone(&store);
        shared.set("k", "v".to_string()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_write_creates_file_in_cache_directory() {
        let (store, temp_dir) = create_test_store();
        store.set("profile", "{\"a\":1}".to_string()).unwrap();

        let expected_path = store.path_for("profile");
        assert_eq!(expected_path.parent(), Some(temp_dir.path()));
        assert!(expected_path.exists(), "Cache file should exist");
        assert_eq!(fs::read_to_string(expected_path).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_file_store_read_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.get("nonexistent_key").unwrap().is_none());
    }

    #[test]
    fn test_file_store_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache");
        let store = FileStore::with_dir(&nested_path);

        store.set("nested_key", "1".to_string()).unwrap();

        assert!(store.path_for("nested_key").starts_with(&nested_path));
        assert!(store.path_for("nested_key").exists());
    }

    #[test]
    fn test_file_store_names_start_with_readable_prefix() {
        let (store, temp_dir) = create_test_store();
        let path = store.path_for("job:https://example.com/jobs?id=1");
        assert_eq!(path.parent(), Some(temp_dir.path()));

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("job_https___example.com_jobs_id_1-"), "name was {}", name);
        assert!(name.ends_with(".json"));

        store.set("job:1", "x".to_string()).unwrap();
        assert_eq!(store.get("job:1").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_file_store_keeps_similar_keys_apart() {
        let (store, _temp_dir) = create_test_store();
        let a = "url:https://api/jobs?page=1";
        let b = "url:https://api/jobs/page=1";
        assert_ne!(store.path_for(a), store.path_for(b));

        store.set(a, "\"page one\"".to_string()).unwrap();
        assert_eq!(store.get(b).unwrap(), None, "second key must not see first key's data");

        store.set(b, "\"page two\"".to_string()).unwrap();
        assert_eq!(store.get(a).unwrap().as_deref(), Some("\"page one\""));
        assert_eq!(store.get(b).unwrap().as_deref(), Some("\"page two\""));
    }

    #[test]
    fn test_file_store_handles_long_keys() {
        let (store, _temp_dir) = create_test_store();
        let key = format!("url:https://api/jobs?q={}", "x".repeat(300));
        let longer = format!("{}y", key);

        let name_len = store.path_for(&key).file_name().unwrap().len();
        assert!(name_len < 255, "file name length {} exceeds OS limits", name_len);

        store.set(&key, "1".to_string()).expect("long keys should be storable");
        store.set(&longer, "2".to_string()).unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("1"));
        assert_eq!(store.get(&longer).unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_overwrite() {
        let (store, _temp_dir) = create_test_store();
        store.set("k", "first".to_string()).unwrap();
        store.set("k", "second".to_string()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = FileStore::new() {
            assert!(store.dir().to_string_lossy().contains("autoapply"));
        }
        // No home directory means no default store; nothing to check then
    }
}
