//! Pantry inventory facade.
//!
//! All operations complete against the local store immediately; the sync
//! engine pushes changes to the backend in the background. Reads never
//! touch the network.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::connectivity::Connectivity;
use crate::models::{NewPantryItem, PantryItem, PantryItemPatch};
use crate::repo::PantryRepository;
use crate::store::PantryDb;
use crate::sync::SyncEngine;

pub struct PantryStore {
    db: Arc<PantryDb>,
    engine: SyncEngine,
}

impl PantryStore {
    /// Wrap a pantry store and spawn its sync worker.
    /// Must be called from within a tokio runtime.
    pub fn new(
        db: Arc<PantryDb>,
        repo: Arc<dyn PantryRepository>,
        connectivity: Connectivity,
        debounce: Duration,
    ) -> Self {
        let engine = SyncEngine::start(db.clone(), repo, connectivity, debounce);
        Self { db, engine }
    }

    // ===== Reads =====

    /// All items in insertion order.
    pub fn items(&self) -> Vec<PantryItem> {
        self.db.all()
    }

    pub fn get(&self, local_id: u64) -> Option<PantryItem> {
        self.db.get(local_id)
    }

    /// Items sharing an ingredient, e.g. to answer "do I have tomatoes?".
    pub fn by_ingredient(&self, ingredient_id: i64) -> Vec<PantryItem> {
        self.db.by_ingredient(ingredient_id)
    }

    /// Items expiring on or before `date`, soonest first.
    pub fn expiring_on_or_before(&self, date: NaiveDate) -> Vec<PantryItem> {
        self.db.expiring_on_or_before(date)
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn has_unsynced(&self) -> bool {
        self.db.has_unsynced()
    }

    // ===== Writes =====

    /// Add an item. Returns the stored item with its assigned id; the push
    /// to the backend happens in the background.
    pub fn add_item(&self, new: NewPantryItem) -> PantryItem {
        let item = self.db.insert(new);
        self.engine.schedule();
        item
    }

    /// Apply a patch. Returns the item as stored afterwards, or `None` if
    /// the id is unknown. A push is scheduled whenever the item is left
    /// dirty; a patch that changes nothing on a synced item schedules none.
    pub fn update_item(&self, local_id: u64, patch: &PantryItemPatch) -> Option<PantryItem> {
        let updated = self.db.update(local_id, patch)?;
        if !updated.is_synced {
            self.engine.schedule();
        }
        Some(updated)
    }

    pub fn remove_item(&self, local_id: u64) -> Option<PantryItem> {
        let removed = self.db.remove(local_id)?;
        self.engine.schedule();
        Some(removed)
    }

    /// Wipe local items without propagating the deletions. Used when
    /// signing out on a shared device; the account's pantry stays intact
    /// on the backend.
    pub fn clear_local(&self) {
        self.db.clear();
    }

    // ===== Sync control =====

    /// Push pending changes now instead of waiting out the debounce window.
    pub fn sync_now(&self) {
        self.engine.flush_now();
    }

    /// Stop the sync worker after one final push of pending changes.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
