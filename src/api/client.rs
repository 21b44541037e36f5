//! HTTP client for the recipe/pantry backend.
//!
//! Implements the repository traits over REST. Transport failures are
//! retried with doubling backoff; HTTP error responses are classified by
//! [`ApiError::from_status`] and returned immediately.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use async_trait::async_trait;

use crate::models::{RecipeDetail, RecipeDraft, RecipeId, RecipeSummary, RemotePantryItem};
use crate::repo::{PantryRepository, RecipePage, RecipeRepository};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
/// 30s allows for slow backend responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for failed network requests.
/// Only transport failures retry; an HTTP error response is final.
const MAX_NETWORK_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for network retries.
/// 2 seconds gives a dropped connection a realistic chance to recover.
const INITIAL_BACKOFF_MS: u64 = 2000;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeedPageResponse {
    #[serde(default)]
    recipes: Vec<RecipeSummary>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
    #[serde(rename = "hasMore", default)]
    has_more: bool,
}

impl From<FeedPageResponse> for RecipePage {
    fn from(response: FeedPageResponse) -> Self {
        RecipePage {
            items: response.recipes,
            next_cursor: response.next_cursor,
            has_more: response.has_more,
        }
    }
}

#[derive(Debug, Serialize)]
struct PantryPushRequest<'a> {
    items: &'a [RemotePantryItem],
}

#[derive(Debug, Deserialize)]
struct PantryPullResponse {
    #[serde(default)]
    items: Vec<RemotePantryItem>,
}

/// API client for the recipe backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a new API client with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        let base_url = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check if a response is successful, returning a classified error if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, retrying transport failures with doubling backoff.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.apply_auth(build()).send().await {
                Ok(response) => return Self::check_response(response).await,
                Err(err) => {
                    retries += 1;
                    if retries > MAX_NETWORK_RETRIES {
                        return Err(err.into());
                    }
                    warn!(error = %err, retry = retries, backoff_ms, "Network error, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send_with_retry(build).await?;
        Ok(response.json().await?)
    }
}

// ============================================================================
// Repository implementations
// ============================================================================

#[async_trait]
impl RecipeRepository for ApiClient {
    async fn list(&self, cursor: Option<&str>) -> Result<RecipePage, ApiError> {
        let url = self.url("/recipes");
        let page: FeedPageResponse = self
            .get_json(|| {
                let mut request = self.client.get(&url);
                if let Some(cursor) = cursor {
                    request = request.query(&[("cursor", cursor)]);
                }
                request
            })
            .await?;
        Ok(page.into())
    }

    async fn get(&self, id: &RecipeId) -> Result<RecipeDetail, ApiError> {
        let url = self.url(&format!("/recipes/{}", id));
        self.get_json(|| self.client.get(&url)).await
    }

    async fn create(&self, draft: &RecipeDraft) -> Result<RecipeDetail, ApiError> {
        let url = self.url("/recipes");
        let response = self
            .send_with_retry(|| self.client.post(&url).json(draft))
            .await?;
        Ok(response.json().await?)
    }

    async fn update(&self, recipe: &RecipeDetail) -> Result<RecipeDetail, ApiError> {
        let url = self.url(&format!("/recipes/{}", recipe.id));
        let response = self
            .send_with_retry(|| self.client.put(&url).json(recipe))
            .await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, id: &RecipeId) -> Result<(), ApiError> {
        let url = self.url(&format!("/recipes/{}", id));
        self.send_with_retry(|| self.client.delete(&url)).await?;
        Ok(())
    }
}

#[async_trait]
impl PantryRepository for ApiClient {
    async fn push(&self, items: &[RemotePantryItem]) -> Result<(), ApiError> {
        let url = self.url("/pantry");
        let body = PantryPushRequest { items };
        self.send_with_retry(|| self.client.put(&url).json(&body)).await?;
        Ok(())
    }

    async fn pull(&self) -> Result<Vec<RemotePantryItem>, ApiError> {
        let url = self.url("/pantry");
        let response: PantryPullResponse = self.get_json(|| self.client.get(&url)).await?;
        Ok(response.items)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://api.example.com/").unwrap();
        assert_eq!(client.url("/recipes"), "https://api.example.com/recipes");
    }

    #[test]
    fn test_feed_page_parses_with_missing_optionals() {
        let json = r#"{"recipes": [{"id": 1, "title": "Ramen"}]}"#;
        let page: FeedPageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.recipes.len(), 1);
        assert_eq!(page.next_cursor, None);
        assert!(!page.has_more);
    }

    #[test]
    fn test_feed_page_parses_pagination_fields() {
        let json = r#"{
            "recipes": [{"id": "lasagna-9", "title": "Lasagna", "imageUrl": "https://img/9.jpg"}],
            "nextCursor": "p2",
            "hasMore": true
        }"#;
        let page: FeedPageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.recipes[0].id, RecipeId::from("lasagna-9"));
        assert_eq!(page.recipes[0].image_url.as_deref(), Some("https://img/9.jpg"));
        assert_eq!(page.next_cursor.as_deref(), Some("p2"));
        assert!(page.has_more);
    }

    #[test]
    fn test_recipe_detail_parses_wire_format() {
        let json = r#"{
            "id": 42,
            "title": "Shakshuka",
            "author": {"id": 7, "name": "Nadia"},
            "ingredients": [{"name": "Egg", "quantity": 4.0}],
            "steps": ["Simmer", "Crack eggs"],
            "createdAt": "2026-01-15T09:30:00Z"
        }"#;
        let detail: RecipeDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.id, RecipeId::Int(42));
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.steps.len(), 2);
        assert!(detail.created_at.is_some());
    }

    #[test]
    fn test_pantry_pull_parses_items() {
        let json = r#"{"items": [
            {"ingredientId": 3, "name": "Milk", "quantity": 1.0, "unit": "liter", "expirationDate": "2026-09-02"}
        ]}"#;
        let response: PantryPullResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].unit, Unit::Liter);
        assert!(response.items[0].expiration_date.is_some());
    }
}
