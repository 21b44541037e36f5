//! Session-scoped degradation for failing storage.
//!
//! The first failed write flips the store into memory-only mode for the rest
//! of the session: later writes land in an overlay map, reads check the
//! overlay before the durable layer. The user keeps a working (if volatile)
//! cache instead of an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::kv::{KeyValueStore, MemoryStore};
use crate::store::StoreError;

pub struct ResilientStore {
    primary: Arc<dyn KeyValueStore>,
    overlay: MemoryStore,
    degraded: AtomicBool,
}

impl ResilientStore {
    pub fn new(primary: Arc<dyn KeyValueStore>) -> Self {
        Self {
            primary,
            overlay: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn enter_degraded(&self, err: &StoreError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!(
                error = %err,
                quota = err.is_quota(),
                "Storage write failed; keeping cache in memory for this session"
            );
        }
    }
}

impl KeyValueStore for ResilientStore {
    fn get(&self, key: &str) -> Option<String> {
        // Overlay wins: it holds everything written since degradation
        self.overlay.get(key).or_else(|| self.primary.get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if !self.is_degraded() {
            match self.primary.set(key, value) {
                Ok(()) => return Ok(()),
                Err(e) => self.enter_degraded(&e),
            }
        }
        self.overlay.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _ = self.overlay.remove(key);
        // Removal frees space, so it is attempted even while degraded
        if let Err(e) = self.primary.remove(key) {
            debug!(key, error = %e, "Failed to remove durable entry");
        }
        Ok(())
    }

    fn clear_matching(&self, prefix: &str) -> Result<(), StoreError> {
        let _ = self.overlay.clear_matching(prefix);
        if let Err(e) = self.primary.clear_matching(prefix) {
            debug!(prefix, error = %e, "Failed to clear durable entries");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Store whose writes always fail, backed by a map for reads.
    #[derive(Default)]
    struct BrokenDisk {
        backing: MemoryStore,
        set_attempts: AtomicUsize,
    }

    impl KeyValueStore for BrokenDisk {
        fn get(&self, key: &str) -> Option<String> {
            self.backing.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            self.set_attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Quota("no space".to_string()))
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.backing.remove(key)
        }

        fn clear_matching(&self, prefix: &str) -> Result<(), StoreError> {
            self.backing.clear_matching(prefix)
        }
    }

    #[test]
    fn test_degrades_on_first_write_failure() {
        let primary = Arc::new(BrokenDisk::default());
        let store = ResilientStore::new(primary.clone());

        store.set("recipes.feed", "v1").unwrap();
        assert!(store.is_degraded());
        assert_eq!(store.get("recipes.feed").as_deref(), Some("v1"));

        // Once degraded, the durable layer is no longer touched by writes
        store.set("recipes.feed", "v2").unwrap();
        assert_eq!(primary.set_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("recipes.feed").as_deref(), Some("v2"));
    }

    #[test]
    fn test_durable_values_stay_readable_while_degraded() {
        let primary = Arc::new(BrokenDisk::default());
        primary.backing.set("recipes.visited", "old").unwrap();
        let store = ResilientStore::new(primary);

        store.set("recipes.feed", "new").unwrap();
        assert!(store.is_degraded());

        assert_eq!(store.get("recipes.visited").as_deref(), Some("old"));
        assert_eq!(store.get("recipes.feed").as_deref(), Some("new"));
    }

    #[test]
    fn test_remove_reaches_durable_layer_while_degraded() {
        let primary = Arc::new(BrokenDisk::default());
        primary.backing.set("recipes.feed", "stale").unwrap();
        let store = ResilientStore::new(primary.clone());

        store.set("x", "force degrade").unwrap();
        store.remove("recipes.feed").unwrap();

        assert_eq!(store.get("recipes.feed"), None);
        assert_eq!(primary.backing.get("recipes.feed"), None);
    }
}
