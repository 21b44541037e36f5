//! Offline-first caches over the persistent key/value store.
//!
//! Two caches share the same envelope and staleness machinery:
//!
//! - `FeedCache`: the recipe feed with TTL expiry, merge, and a
//!   no-data-loss overwrite guard
//! - `VisitedRecipeCache`: a bounded least-recently-saved cache of full
//!   recipe details for instant rendering
//!
//! Staleness is availability-first: while offline, age never hides data.

pub mod envelope;
pub mod feed;
pub mod staleness;
pub mod visited;

pub use envelope::CacheEnvelope;
pub use feed::{FeedCache, FeedSnapshot, FEED_KEY};
pub use staleness::{StalenessPolicy, FEED_TTL_MINUTES, VISITED_STALE_MINUTES};
pub use visited::{VisitedEntry, VisitedRecipeCache, DEFAULT_VISITED_CAPACITY, VISITED_KEY};
