//! Recipe read and write paths.
//!
//! Reads go through the caches: the feed is read-through with a TTL, the
//! detail view is stale-while-revalidate. Writes go to the backend first
//! and then patch both caches in place, so every surface reflects the
//! change without a refetch. All network fetches are single-flighted
//! through [`RequestDeduplicator`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::cache::{FeedCache, FeedSnapshot, VisitedRecipeCache};
use crate::connectivity::Connectivity;
use crate::dedupe::RequestDeduplicator;
use crate::models::{RecipeDetail, RecipeDraft, RecipeId};
use crate::repo::RecipeRepository;
use crate::store::KeyValueStore;

#[derive(Clone)]
pub struct RecipeService {
    repo: Arc<dyn RecipeRepository>,
    feed: Arc<FeedCache>,
    visited: Arc<VisitedRecipeCache>,
    store: Arc<dyn KeyValueStore>,
    connectivity: Connectivity,
    feed_dedupe: RequestDeduplicator<FeedSnapshot>,
    detail_dedupe: RequestDeduplicator<RecipeDetail>,
}

impl RecipeService {
    /// Wire the service over its caches. Background revalidation tasks
    /// spawn onto the current tokio runtime.
    pub fn new(
        repo: Arc<dyn RecipeRepository>,
        feed: FeedCache,
        visited: VisitedRecipeCache,
        store: Arc<dyn KeyValueStore>,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            repo,
            feed: Arc::new(feed),
            visited: Arc::new(visited),
            store,
            connectivity,
            feed_dedupe: RequestDeduplicator::new(),
            detail_dedupe: RequestDeduplicator::new(),
        }
    }

    // ===== Feed =====

    /// The recipe feed: cached if available, fetched and merged otherwise.
    ///
    /// Offline with nothing cached this returns the fetch error; callers
    /// render their empty state from it.
    pub async fn feed(&self) -> Result<FeedSnapshot, ApiError> {
        if let Some(cached) = self.feed.get() {
            return Ok(cached);
        }
        self.refresh_feed().await
    }

    /// Fetch the first page and merge it into the cache, regardless of the
    /// cache's age. Backs pull-to-refresh.
    pub async fn refresh_feed(&self) -> Result<FeedSnapshot, ApiError> {
        let fetched = self.fetch_page(None).await?;
        Ok(self.feed.merge(fetched))
    }

    /// Fetch the page after the cached feed and extend the cache with it.
    /// A feed without further pages is returned unchanged.
    pub async fn load_more(&self) -> Result<FeedSnapshot, ApiError> {
        let Some(current) = self.feed.get() else {
            return self.refresh_feed().await;
        };
        if !current.has_more {
            return Ok(current);
        }
        let Some(cursor) = current.next_cursor else {
            return Ok(current);
        };

        let page = self.fetch_page(Some(cursor)).await?;
        Ok(self.feed.append(page))
    }

    /// Age of the cached feed for status surfaces ("updated 5m ago").
    pub fn feed_age_display(&self) -> Option<String> {
        self.feed.age_display()
    }

    async fn fetch_page(&self, cursor: Option<String>) -> Result<FeedSnapshot, ApiError> {
        let key = match &cursor {
            Some(cursor) => format!("recipes.list:{cursor}"),
            None => "recipes.list".to_string(),
        };
        let repo = self.repo.clone();
        self.feed_dedupe
            .run(&key, move || async move {
                Ok(repo.list(cursor.as_deref()).await?.into())
            })
            .await
    }

    // ===== Detail =====

    /// A recipe's detail, visited-cache first.
    ///
    /// A cached entry is returned immediately; if it has crossed the
    /// staleness threshold while online, a background task refetches it and
    /// updates the cache for the next read. Only a cache miss makes the
    /// caller wait for the network.
    pub async fn recipe(&self, id: &RecipeId) -> Result<RecipeDetail, ApiError> {
        if let Some(entry) = self.visited.get(id) {
            // Revalidation needs the network; offline the entry is simply
            // served as-is, however old
            let online = self.connectivity.is_online();
            if online && self.visited.is_stale(&entry, online) {
                self.spawn_revalidation(id.clone());
            }
            return Ok(entry.payload);
        }

        let detail = self.fetch_detail(id.clone()).await?;
        self.visited.save(detail.clone());
        Ok(detail)
    }

    fn spawn_revalidation(&self, id: RecipeId) {
        let service = self.clone();
        tokio::spawn(async move {
            match service.fetch_detail(id.clone()).await {
                Ok(detail) => service.visited.save(detail),
                // The entry stays served as-is until a later refetch works
                Err(e) => debug!(id = %id, error = %e, "Background revalidation failed"),
            }
        });
    }

    async fn fetch_detail(&self, id: RecipeId) -> Result<RecipeDetail, ApiError> {
        let key = format!("recipes.get:{id}");
        let repo = self.repo.clone();
        self.detail_dedupe
            .run(&key, move || async move { repo.get(&id).await })
            .await
    }

    // ===== Writes =====

    /// Create a recipe and surface it in both caches: the detail is saved
    /// as visited and the feed gets it prepended without losing its
    /// pagination state.
    pub async fn create(&self, draft: &RecipeDraft) -> Result<RecipeDetail, ApiError> {
        let created = self.repo.create(draft).await?;
        self.visited.save(created.clone());
        self.feed
            .merge(FeedSnapshot::new(vec![created.summary()], None, false));
        Ok(created)
    }

    /// Update a recipe and patch both caches in place.
    pub async fn update(&self, recipe: &RecipeDetail) -> Result<RecipeDetail, ApiError> {
        let updated = self.repo.update(recipe).await?;
        self.visited.save(updated.clone());
        self.feed.update_recipe(&updated.summary());
        Ok(updated)
    }

    /// Delete a recipe and scrub it from both caches.
    pub async fn delete(&self, id: &RecipeId) -> Result<(), ApiError> {
        self.repo.delete(id).await?;
        self.visited.remove(id);
        self.feed.remove_recipe(id);
        Ok(())
    }

    // ===== Maintenance =====

    /// Drop all cached recipe data, including any stray keys in the recipe
    /// namespace. Used on sign-out and schema migrations.
    pub fn invalidate(&self) {
        self.visited.clear();
        self.feed.clear();
        if let Err(e) = self.store.clear_matching("recipes.") {
            warn!(error = %e, "Failed to sweep recipe cache keys");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
