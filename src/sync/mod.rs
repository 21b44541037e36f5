//! Local-first synchronization between the pantry store and the backend.
//!
//! The store is the source of truth for the UI; the engine converges the
//! backend toward it with debounced full-snapshot pushes and hydrates an
//! empty store from the backend exactly once on cold start.

pub mod engine;

pub use engine::{SyncEngine, DEFAULT_SYNC_DEBOUNCE_MS};
