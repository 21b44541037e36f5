//! Bounded cache of recently visited recipe details.
//!
//! Detail views render from this cache instantly and revalidate in the
//! background once an entry crosses the staleness threshold. Eviction is
//! least-recently-saved: `save` refreshes an entry's position, `get`
//! deliberately does not, so lookups never keep an entry alive.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use lru::LruCache;
use tracing::warn;

use crate::cache::envelope::CacheEnvelope;
use crate::cache::staleness::StalenessPolicy;
use crate::lock::{rw_read, rw_write};
use crate::models::{RecipeDetail, RecipeId};
use crate::store::KeyValueStore;

/// Store key for the visited-recipes envelope.
pub const VISITED_KEY: &str = "recipes.visited";

/// Default bound on locally kept visited recipes.
/// Fifty full details cover a long browsing session while keeping the
/// persisted envelope at a reasonable size.
pub const DEFAULT_VISITED_CAPACITY: usize = 50;

/// A visited recipe with the timestamp of its last save.
pub type VisitedEntry = CacheEnvelope<RecipeDetail>;

pub struct VisitedRecipeCache {
    store: Arc<dyn KeyValueStore>,
    entries: RwLock<LruCache<RecipeId, VisitedEntry>>,
    policy: StalenessPolicy,
}

impl VisitedRecipeCache {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize, policy: StalenessPolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let cache = Self {
            store,
            entries: RwLock::new(LruCache::new(capacity)),
            policy,
        };
        cache.restore();
        cache
    }

    /// Look up a visited recipe without refreshing its eviction position.
    pub fn get(&self, id: &RecipeId) -> Option<VisitedEntry> {
        rw_read(&self.entries, "visited_cache").peek(id).cloned()
    }

    /// Insert or overwrite by recipe id, stamping the entry now. The entry
    /// becomes the most recently saved; the least recently saved one is
    /// evicted beyond capacity.
    pub fn save(&self, recipe: RecipeDetail) {
        let id = recipe.id.clone();
        let entry = CacheEnvelope::new(recipe);
        rw_write(&self.entries, "visited_cache").put(id, entry);
        self.persist();
    }

    /// Drop one recipe, e.g. after it was deleted upstream.
    pub fn remove(&self, id: &RecipeId) {
        let removed = rw_write(&self.entries, "visited_cache").pop(id);
        if removed.is_some() {
            self.persist();
        }
    }

    pub fn clear(&self) {
        rw_write(&self.entries, "visited_cache").clear();
        if let Err(e) = self.store.remove(VISITED_KEY) {
            warn!(error = %e, "Failed to clear visited cache");
        }
    }

    /// Whether an entry is due for background revalidation. The entry is
    /// still rendered either way.
    pub fn is_stale(&self, entry: &VisitedEntry, online: bool) -> bool {
        entry.is_stale(&self.policy, online)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, "visited_cache").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn restore(&self) {
        let Some(contents) = self.store.get(VISITED_KEY) else { return };
        let stored: CacheEnvelope<Vec<VisitedEntry>> = match serde_json::from_str(&contents) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Visited cache entry is corrupt; discarding");
                if let Err(e) = self.store.remove(VISITED_KEY) {
                    warn!(error = %e, "Failed to clear visited cache");
                }
                return;
            }
        };

        // Entries are stored least-recently-saved first, so replaying them
        // through put() reproduces both membership and eviction order. With
        // a shrunken capacity the oldest entries fall off here.
        let mut entries = rw_write(&self.entries, "visited_cache");
        for entry in stored.payload {
            entries.put(entry.payload.id.clone(), entry);
        }
    }

    fn persist(&self) {
        let snapshot: Vec<VisitedEntry> = {
            let entries = rw_read(&self.entries, "visited_cache");
            let mut ordered: Vec<VisitedEntry> =
                entries.iter().map(|(_, entry)| entry.clone()).collect();
            // iter() walks most-recent first; stored order is oldest first
            ordered.reverse();
            ordered
        };

        match serde_json::to_string(&CacheEnvelope::new(snapshot)) {
            Ok(contents) => {
                if let Err(e) = self.store.set(VISITED_KEY, &contents) {
                    warn!(error = %e, "Failed to persist visited cache");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize visited cache"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn detail(id: i64, title: &str) -> RecipeDetail {
        RecipeDetail {
            id: RecipeId::Int(id),
            title: title.to_string(),
            description: None,
            image_url: None,
            author: None,
            ingredients: vec![],
            steps: vec![],
            servings: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn cache(capacity: usize) -> (Arc<MemoryStore>, VisitedRecipeCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = VisitedRecipeCache::new(store.clone(), capacity, StalenessPolicy::visited_default());
        (store, cache)
    }

    #[test]
    fn test_save_overwrites_by_id_without_duplicating() {
        let (_, cache) = cache(10);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(1, "Ramen (improved)"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&RecipeId::Int(1)).unwrap().payload.title, "Ramen (improved)");
    }

    #[test]
    fn test_capacity_evicts_least_recently_saved() {
        let (_, cache) = cache(2);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(2, "Laksa"));
        cache.save(detail(3, "Pho"));

        assert_eq!(cache.get(&RecipeId::Int(1)), None);
        assert!(cache.get(&RecipeId::Int(2)).is_some());
        assert!(cache.get(&RecipeId::Int(3)).is_some());
    }

    #[test]
    fn test_get_does_not_refresh_eviction_order() {
        let (_, cache) = cache(2);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(2, "Laksa"));

        // A lookup must not protect entry 1 from eviction
        cache.get(&RecipeId::Int(1)).unwrap();
        cache.save(detail(3, "Pho"));

        assert_eq!(cache.get(&RecipeId::Int(1)), None);
        assert!(cache.get(&RecipeId::Int(2)).is_some());
    }

    #[test]
    fn test_resaving_refreshes_eviction_order() {
        let (_, cache) = cache(2);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(2, "Laksa"));
        cache.save(detail(1, "Ramen v2"));
        cache.save(detail(3, "Pho"));

        assert!(cache.get(&RecipeId::Int(1)).is_some());
        assert_eq!(cache.get(&RecipeId::Int(2)), None);
    }

    #[test]
    fn test_lookup_coerces_id_forms() {
        let (_, cache) = cache(10);
        cache.save(detail(7, "Bibimbap"));
        assert!(cache.get(&RecipeId::from("7")).is_some());
    }

    #[test]
    fn test_restore_preserves_eviction_order() {
        let (store, cache) = cache(2);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(2, "Laksa"));

        // New instance over the same store sees the same entries
        let restored = VisitedRecipeCache::new(store, 2, StalenessPolicy::visited_default());
        assert_eq!(restored.len(), 2);

        // Entry 1 is still the least recently saved
        restored.save(detail(3, "Pho"));
        assert_eq!(restored.get(&RecipeId::Int(1)), None);
        assert!(restored.get(&RecipeId::Int(2)).is_some());
    }

    #[test]
    fn test_restore_with_smaller_capacity_keeps_newest() {
        let (store, cache) = cache(3);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(2, "Laksa"));
        cache.save(detail(3, "Pho"));

        let restored = VisitedRecipeCache::new(store, 2, StalenessPolicy::visited_default());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(&RecipeId::Int(1)), None);
        assert!(restored.get(&RecipeId::Int(3)).is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let (store, cache) = cache(10);
        cache.save(detail(1, "Ramen"));
        cache.save(detail(2, "Laksa"));

        cache.remove(&RecipeId::Int(1));
        assert_eq!(cache.get(&RecipeId::Int(1)), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(store.get(VISITED_KEY), None);
    }

    #[test]
    fn test_corrupt_store_entry_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(VISITED_KEY, "broken").unwrap();

        let cache = VisitedRecipeCache::new(store.clone(), 10, StalenessPolicy::visited_default());
        assert!(cache.is_empty());
        assert_eq!(store.get(VISITED_KEY), None);
    }
}
