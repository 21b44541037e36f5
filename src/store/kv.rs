//! Durable key/value persistence behind the caches.
//!
//! Keys are dot-delimited identifiers (`recipes.feed`, `recipes.visited`);
//! values are JSON documents serialized by the caller. `FileStore` keeps one
//! file per key under a data directory, `MemoryStore` backs tests and the
//! quota-degraded session mode.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::lock::mutex_lock;
use crate::store::StoreError;

pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys and unreadable entries both come back as
    /// `None`; a cache can always be rebuilt from the network.
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every key starting with `prefix`. Used for account-wide cache
    /// clears on logout.
    fn clear_matching(&self, prefix: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Disk-backed store
// ============================================================================

/// One JSON file per key under a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(StoreError::from_io)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read store entry");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::write(self.path_for(key), value).map_err(StoreError::from_io)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from_io(e)),
        }
    }

    fn clear_matching(&self, prefix: &str) -> Result<(), StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(StoreError::from_io)?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.strip_suffix(".json").is_some_and(|key| key.starts_with(prefix)) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    // Best effort: a leftover file only costs disk space
                    warn!(file = name, error = %e, "Failed to remove store entry");
                }
            }
        }
        debug!(prefix, "Cleared store entries");
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, "memory_store").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        mutex_lock(&self.entries, "memory_store").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        mutex_lock(&self.entries, "memory_store").insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        mutex_lock(&self.entries, "memory_store").remove(key);
        Ok(())
    }

    fn clear_matching(&self, prefix: &str) -> Result<(), StoreError> {
        mutex_lock(&self.entries, "memory_store").retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
