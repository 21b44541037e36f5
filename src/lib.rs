//! Larder - an offline-first cache and sync core for recipe apps.
//!
//! The crate keeps a recipe feed, visited recipe details, and a pantry
//! inventory usable without a network connection:
//!
//! - reads are served from local storage first; the network only fills
//!   gaps and refreshes stale data in the background
//! - pantry writes apply locally right away and sync to the backend with
//!   a debounced full-snapshot push
//! - losing connectivity degrades freshness, never availability
//!
//! [`Larder::open`] wires the whole stack; the individual pieces (stores,
//! caches, the sync engine) are public for hosts that need custom wiring.
//!
//! ```no_run
//! use larder::{Config, Larder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let larder = Larder::open(&Config::load()?)?;
//!     let feed = larder.recipes.feed().await?;
//!     println!("{} recipes", feed.recipes.len());
//!     larder.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod dedupe;
mod lock;
pub mod models;
pub mod pantry;
pub mod recipes;
pub mod repo;
pub mod store;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use cache::{FeedCache, VisitedRecipeCache};
use repo::{PantryRepository, RecipeRepository};
use store::{FileStore, KeyValueStore, PantryDb, ResilientStore};

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use connectivity::Connectivity;
pub use pantry::PantryStore;
pub use recipes::RecipeService;

/// The wired-up stack: recipe and pantry services over shared storage and
/// connectivity, with the sync worker running.
pub struct Larder {
    pub recipes: RecipeService,
    pub pantry: PantryStore,
    pub connectivity: Connectivity,
}

impl Larder {
    /// Open the stack under the platform data directory.
    ///
    /// Must be called from within a tokio runtime; the pantry sync worker
    /// spawns immediately. Connectivity starts online until the host
    /// reports otherwise through [`Connectivity::set_online`].
    pub fn open(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        Self::open_at(config, &data_dir)
    }

    /// Open rooted at an explicit directory, for tests and portable
    /// installs.
    pub fn open_at(config: &Config, data_dir: &Path) -> Result<Self> {
        let connectivity = Connectivity::default();

        let disk = FileStore::new(data_dir.join("cache"))
            .context("Failed to open the cache directory")?;
        let store: Arc<dyn KeyValueStore> = Arc::new(ResilientStore::new(Arc::new(disk)));

        let mut client = ApiClient::with_timeout(&config.api_base_url, config.request_timeout())
            .context("Failed to build the HTTP client")?;
        if let Some(token) = &config.api_token {
            client.set_token(token.clone());
        }
        let client = Arc::new(client);

        let feed = FeedCache::new(store.clone(), connectivity.clone(), config.feed_policy());
        let visited = VisitedRecipeCache::new(
            store.clone(),
            config.visited_capacity,
            config.visited_policy(),
        );
        let recipes = RecipeService::new(
            client.clone() as Arc<dyn RecipeRepository>,
            feed,
            visited,
            store,
            connectivity.clone(),
        );

        let db = Arc::new(
            PantryDb::open(data_dir.join("pantry.json"))
                .context("Failed to open the pantry snapshot")?,
        );
        let pantry = PantryStore::new(
            db,
            client as Arc<dyn PantryRepository>,
            connectivity.clone(),
            config.sync_debounce(),
        );

        Ok(Self {
            recipes,
            pantry,
            connectivity,
        })
    }

    /// Flush pending pantry changes and stop the sync worker.
    pub async fn shutdown(&self) {
        self.pantry.shutdown().await;
    }
}

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
/// Safe to call from every test; only the first call installs a subscriber.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
