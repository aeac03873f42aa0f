//! Durable key-value store abstraction.
//!
//! The layout engine only needs three operations over opaque string blobs
//! keyed by a caller-chosen table identity. [`MemoryStore`] backs tests and
//! degraded in-memory-only sessions; [`DirStore`] keeps one JSON file per
//! key with atomic replace semantics.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Error from a durable store write.
///
/// Reads never error: anything unreadable is reported as absent, because a
/// missing record and a broken record degrade the same way.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract durable key-value capability.
pub trait LayoutStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous blob.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Forget `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str);
}

/// In-process store, used by tests and in-memory-only sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// File-per-key store under a single directory.
///
/// Writes go through a temp file and rename so a crash mid-write never
/// leaves a truncated record behind.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Map a caller-chosen key to a safe file name.
    fn entry_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl LayoutStore for DirStore {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(key)).ok()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let temp = path.with_extension("tmp");
        fs::write(&temp, value)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) {
        let _ = fs::remove_file(self.entry_path(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.read("grid").is_none());

        store.write("grid", "{\"v\":1}").unwrap();
        assert_eq!(store.read("grid").as_deref(), Some("{\"v\":1}"));

        store.delete("grid");
        assert!(store.read("grid").is_none());
        // Deleting again is fine.
        store.delete("grid");
    }

    #[test]
    fn dir_store_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let store = DirStore::new(temp.path());

        store.write("retidos/grid", "blob").unwrap();
        assert_eq!(store.read("retidos/grid").as_deref(), Some("blob"));

        // The slash must not have escaped the directory.
        assert!(temp.path().join("retidos_grid.json").exists());

        store.delete("retidos/grid");
        assert!(store.read("retidos/grid").is_none());
    }

    #[test]
    fn dir_store_overwrite_replaces() {
        let temp = tempfile::tempdir().unwrap();
        let store = DirStore::new(temp.path());

        store.write("grid", "first").unwrap();
        store.write("grid", "second").unwrap();
        assert_eq!(store.read("grid").as_deref(), Some("second"));
    }

    #[test]
    fn dir_store_missing_key_is_absent() {
        let temp = tempfile::tempdir().unwrap();
        let store = DirStore::new(temp.path());
        assert!(store.read("never-written").is_none());
    }
}
