//! Repository seams between the cache/sync layers and the backend.
//!
//! The caches and the sync engine only ever talk to these traits. The HTTP
//! implementation lives in `api::ApiClient`; tests substitute in-memory
//! fakes.

use async_trait::async_trait;

use crate::api::ApiError;
use crate::cache::FeedSnapshot;
use crate::models::{RecipeDetail, RecipeDraft, RecipeId, RecipeSummary, RemotePantryItem};

/// One page of the recipe feed as the backend returns it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePage {
    pub items: Vec<RecipeSummary>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl From<RecipePage> for FeedSnapshot {
    fn from(page: RecipePage) -> Self {
        FeedSnapshot::new(page.items, page.next_cursor, page.has_more)
    }
}

/// Recipe reads and writes against the backend.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// List recipes from the feed, newest first. `cursor` continues a
    /// previous page.
    async fn list(&self, cursor: Option<&str>) -> Result<RecipePage, ApiError>;

    async fn get(&self, id: &RecipeId) -> Result<RecipeDetail, ApiError>;

    async fn create(&self, draft: &RecipeDraft) -> Result<RecipeDetail, ApiError>;

    async fn update(&self, recipe: &RecipeDetail) -> Result<RecipeDetail, ApiError>;

    async fn delete(&self, id: &RecipeId) -> Result<(), ApiError>;
}

/// Remote pantry state, reconciled by full snapshots.
#[async_trait]
pub trait PantryRepository: Send + Sync {
    /// Replace the remote pantry with `items`.
    async fn push(&self, items: &[RemotePantryItem]) -> Result<(), ApiError>;

    /// Fetch the remote pantry. Only used for cold-start hydration.
    async fn pull(&self) -> Result<Vec<RemotePantryItem>, ApiError>;
}
