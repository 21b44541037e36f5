//! Read-through cache for the recipe feed.
//!
//! One envelope under a fixed key holds the whole feed state: the recipe
//! list plus the pagination cursor. Expiry only applies while online; an
//! offline session keeps serving whatever it has. All merge-vs-replace
//! decisions live here, not in the callers.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::envelope::CacheEnvelope;
use crate::cache::staleness::StalenessPolicy;
use crate::connectivity::Connectivity;
use crate::models::{RecipeId, RecipeSummary};
use crate::store::KeyValueStore;

/// Store key for the feed envelope.
pub const FEED_KEY: &str = "recipes.feed";

/// The cached feed: recipes in display order plus pagination state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub recipes: Vec<RecipeSummary>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
}

impl FeedSnapshot {
    /// Build a snapshot, enforcing its two invariants: recipe ids are
    /// unique (first occurrence wins) and a finished feed carries no cursor.
    pub fn new(recipes: Vec<RecipeSummary>, next_cursor: Option<String>, has_more: bool) -> Self {
        let mut seen = HashSet::new();
        let recipes = recipes
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        Self {
            recipes,
            next_cursor: if has_more { next_cursor } else { None },
            has_more,
        }
    }

    fn ids(&self) -> HashSet<RecipeId> {
        self.recipes.iter().map(|r| r.id.clone()).collect()
    }
}

pub struct FeedCache {
    store: Arc<dyn KeyValueStore>,
    connectivity: Connectivity,
    policy: StalenessPolicy,
}

impl FeedCache {
    pub fn new(store: Arc<dyn KeyValueStore>, connectivity: Connectivity, policy: StalenessPolicy) -> Self {
        Self {
            store,
            connectivity,
            policy,
        }
    }

    /// The cached feed, or `None` on a miss.
    ///
    /// While online, an entry past its TTL counts as a miss and the stored
    /// copy is dropped. While offline the entry is served regardless of age.
    pub fn get(&self) -> Option<FeedSnapshot> {
        let envelope = self.load()?;
        if envelope.is_stale(&self.policy, self.connectivity.is_online()) {
            debug!(age_minutes = envelope.age_minutes(), "Feed cache expired; discarding");
            self.clear();
            return None;
        }
        Some(envelope.payload)
    }

    /// Replace the cached feed, refusing writes that would lose recipes.
    ///
    /// A snapshot smaller than the stored one is dropped with a warning;
    /// shrinking the feed is only legitimate through `remove_recipe` or the
    /// explicit [`reset`](Self::reset).
    pub fn set(&self, snapshot: FeedSnapshot) {
        if let Some(stored) = self.load() {
            if snapshot.recipes.len() < stored.payload.recipes.len() {
                warn!(
                    incoming = snapshot.recipes.len(),
                    stored = stored.payload.recipes.len(),
                    "Refusing to shrink feed cache; keeping stored snapshot"
                );
                return;
            }
        }
        self.persist(snapshot);
    }

    /// Authoritative replace, bypassing the no-data-loss guard.
    pub fn reset(&self, snapshot: FeedSnapshot) {
        self.persist(snapshot);
    }

    /// Reconcile a freshly fetched page with the cached feed.
    ///
    /// The fresh page wins for every id it contains; cached recipes with
    /// other ids are appended after it in their stored order. Pagination
    /// state follows the list tail: the cache's cursor when cached recipes
    /// survived the merge, the fresh page's otherwise. The merged snapshot
    /// is persisted and returned.
    pub fn merge(&self, fresh: FeedSnapshot) -> FeedSnapshot {
        let Some(cached) = self.get() else {
            let fresh = FeedSnapshot::new(fresh.recipes, fresh.next_cursor, fresh.has_more);
            self.persist(fresh.clone());
            return fresh;
        };

        let fresh_ids = fresh.ids();
        let fresh_len = fresh.recipes.len();

        let mut recipes = fresh.recipes;
        recipes.extend(cached.recipes.into_iter().filter(|r| !fresh_ids.contains(&r.id)));

        let cache_contributed = recipes.len() > fresh_len;
        let (next_cursor, has_more) = if cache_contributed {
            (cached.next_cursor, cached.has_more)
        } else {
            (fresh.next_cursor, fresh.has_more)
        };

        let merged = FeedSnapshot::new(recipes, next_cursor, has_more);
        self.persist(merged.clone());
        merged
    }

    /// Extend the feed with the next page. New recipes land at the tail,
    /// ids already present are skipped, and pagination state is taken from
    /// the page since it now is the tail.
    pub fn append(&self, page: FeedSnapshot) -> FeedSnapshot {
        let Some(current) = self.get() else {
            let page = FeedSnapshot::new(page.recipes, page.next_cursor, page.has_more);
            self.persist(page.clone());
            return page;
        };

        let known = current.ids();
        let mut recipes = current.recipes;
        recipes.extend(page.recipes.into_iter().filter(|r| !known.contains(&r.id)));

        let extended = FeedSnapshot::new(recipes, page.next_cursor, page.has_more);
        self.persist(extended.clone());
        extended
    }

    /// Replace a single recipe in place, preserving its feed position.
    /// No-op if the recipe is not in the cached feed.
    pub fn update_recipe(&self, recipe: &RecipeSummary) {
        let Some(envelope) = self.load() else { return };
        let mut snapshot = envelope.payload;

        let Some(slot) = snapshot.recipes.iter_mut().find(|r| r.id == recipe.id) else {
            debug!(id = %recipe.id, "Recipe not in feed cache; skipping update");
            return;
        };
        *slot = recipe.clone();
        self.persist(snapshot);
    }

    /// Drop a recipe from the cached feed. No-op if absent.
    ///
    /// Unlike `update_recipe`, a removal brings no fresh data, so the
    /// envelope keeps its original timestamp and expires on schedule.
    pub fn remove_recipe(&self, id: &RecipeId) {
        let Some(envelope) = self.load() else { return };
        let mut snapshot = envelope.payload;

        let before = snapshot.recipes.len();
        snapshot.recipes.retain(|r| r.id != *id);
        if snapshot.recipes.len() == before {
            return;
        }
        self.persist_at(envelope.cached_at, snapshot);
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(FEED_KEY) {
            warn!(error = %e, "Failed to clear feed cache");
        }
    }

    /// Age of the cached feed for status surfaces ("5m ago"), if present.
    pub fn age_display(&self) -> Option<String> {
        self.load().map(|envelope| envelope.age_display())
    }

    fn load(&self) -> Option<CacheEnvelope<FeedSnapshot>> {
        let contents = self.store.get(FEED_KEY)?;
        match serde_json::from_str::<CacheEnvelope<FeedSnapshot>>(&contents) {
            // Stored snapshots from older builds may not satisfy the current
            // invariants; rebuilding through the constructor re-enforces them
            Ok(CacheEnvelope { cached_at, payload }) => Some(CacheEnvelope {
                cached_at,
                payload: FeedSnapshot::new(payload.recipes, payload.next_cursor, payload.has_more),
            }),
            Err(e) => {
                // A cache entry that no longer parses is a miss, not an error
                warn!(error = %e, "Feed cache entry is corrupt; discarding");
                self.clear();
                None
            }
        }
    }

    fn persist(&self, snapshot: FeedSnapshot) {
        self.write(CacheEnvelope::new(snapshot));
    }

    fn persist_at(&self, cached_at: DateTime<Utc>, snapshot: FeedSnapshot) {
        self.write(CacheEnvelope {
            cached_at,
            payload: snapshot,
        });
    }

    fn write(&self, envelope: CacheEnvelope<FeedSnapshot>) {
        match serde_json::to_string(&envelope) {
            Ok(contents) => {
                if let Err(e) = self.store.set(FEED_KEY, &contents) {
                    warn!(error = %e, "Failed to persist feed cache");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize feed cache"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
