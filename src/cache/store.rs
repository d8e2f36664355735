//! Key-value store backing the persisted location cache
//!
//! Provides a `FileStore` that keeps one JSON document per key in an
//! XDG-compliant cache directory. A store can be invalidated when its host
//! session is torn down; every access after that fails with
//! `StoreError::ContextInvalidated`.

use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The hosting session was torn down while the store was in use
    #[error("extension context invalidated")]
    ContextInvalidated,
}

impl StoreError {
    /// Returns true for errors caused by the host being torn down
    pub fn is_context_invalidated(&self) -> bool {
        matches!(self, StoreError::ContextInvalidated)
    }
}

/// A persistent mapping from string keys to JSON documents
pub trait KeyValueStore: Send + Sync {
    /// Reads the document stored under `key`, `Ok(None)` if there is none
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the document stored under `key`
    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Marks the store unusable; later calls return `ContextInvalidated`
    fn invalidate(&self);
}

/// Stores each key as `<key>.json` in a directory
///
/// Uses `~/.cache/flagtip/` on Linux, or the equivalent XDG path elsewhere.
#[derive(Debug)]
pub struct FileStore {
    /// Directory where documents are stored
    dir: PathBuf,
    /// Set once the owning session has shut down
    invalidated: AtomicBool,
}

impl FileStore {
    /// Creates a FileStore in the XDG cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "flagtip")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            invalidated: AtomicBool::new(false),
        }
    }

    /// Directory documents are written to
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn check_context(&self) -> Result<(), StoreError> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(StoreError::ContextInvalidated);
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_context()?;

        let content = match fs::read_to_string(self.path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&content)?))
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.check_context()?;
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.path(key), json)?;
        Ok(())
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }
}

/// In-memory store for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: std::sync::Mutex<std::collections::HashMap<String, Value>>,
    invalidated: AtomicBool,
    /// When set, every write fails with an I/O error
    pub fail_writes: AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    /// Reads a document regardless of invalidation
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.documents.lock().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(StoreError::ContextInvalidated);
        }
        Ok(self.documents.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(StoreError::ContextInvalidated);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_set_creates_file_in_store_directory() {
        let (store, temp_dir) = create_test_store();

        store
            .set("x_location_cache", &json!({"jdoe": {"location": "Canada"}}))
            .expect("Write should succeed");

        let expected_path = temp_dir.path().join("x_location_cache.json");
        assert!(expected_path.exists(), "Store file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"jdoe\""));
        assert!(content.contains("\"Canada\""));
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_get_returns_written_document() {
        let (store, _temp_dir) = create_test_store();
        let doc = json!({"alice": {"location": "Japan", "expiry": 1, "cachedAt": 0}});

        store.set("key", &doc).unwrap();

        assert_eq!(store.get("key").unwrap(), Some(doc));
    }

    #[test]
    fn test_set_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("store");
        let store = FileStore::with_dir(nested_path.clone());

        store.set("key", &json!({})).expect("Write should succeed");

        assert!(nested_path.join("key.json").exists());
    }

    #[test]
    fn test_corrupt_document_is_serialization_error() {
        let (store, temp_dir) = create_test_store();
        fs::write(temp_dir.path().join("key.json"), "{not json").unwrap();

        let err = store.get("key").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(!err.is_context_invalidated());
    }

    #[test]
    fn test_invalidated_store_rejects_access() {
        let (store, _temp_dir) = create_test_store();
        store.invalidate();

        assert!(store.get("key").unwrap_err().is_context_invalidated());
        assert!(store.set("key", &json!({})).unwrap_err().is_context_invalidated());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = FileStore::new() {
            assert!(store.dir().to_string_lossy().contains("flagtip"));
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
