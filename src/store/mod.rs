//! Local persistence: key/value storage for the caches and the structured
//! pantry table.
//!
//! Storage failures never block the user. The `ResilientStore` wrapper and
//! the pantry table both fall back to memory-only operation for the session
//! after the first failed write.

pub mod error;
pub mod kv;
pub mod pantry;
pub mod resilient;

pub use error::StoreError;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use pantry::PantryDb;
pub use resilient::ResilientStore;
