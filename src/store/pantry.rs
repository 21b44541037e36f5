//! Structured local store for pantry items.
//!
//! Items live in an id-ordered table with two secondary indexes, one on the
//! ingredient grouping key and one on the expiration date. The whole table
//! is persisted as a single JSON snapshot after every mutation; persistence
//! failures degrade the store to memory-only for the session.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::lock::mutex_lock;
use crate::models::{NewPantryItem, PantryItem, PantryItemPatch, RemotePantryItem};
use crate::store::StoreError;

/// On-disk snapshot shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PantryFile {
    #[serde(rename = "nextLocalId")]
    next_local_id: u64,
    items: Vec<PantryItem>,
}

#[derive(Default)]
struct PantryState {
    items: BTreeMap<u64, PantryItem>,
    by_ingredient: BTreeMap<i64, BTreeSet<u64>>,
    by_expiration: BTreeMap<NaiveDate, BTreeSet<u64>>,
    next_local_id: u64,
}

impl PantryState {
    fn allocate_id(&mut self) -> u64 {
        // Ids start at 1 and never recycle, so references stay unambiguous
        // across removals
        self.next_local_id = self.next_local_id.max(1);
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }

    fn index(&mut self, item: &PantryItem) {
        self.by_ingredient
            .entry(item.ingredient_id)
            .or_default()
            .insert(item.local_id);
        if let Some(date) = item.expiration_date {
            self.by_expiration.entry(date).or_default().insert(item.local_id);
        }
    }

    fn unindex(&mut self, item: &PantryItem) {
        if let Some(ids) = self.by_ingredient.get_mut(&item.ingredient_id) {
            ids.remove(&item.local_id);
            if ids.is_empty() {
                self.by_ingredient.remove(&item.ingredient_id);
            }
        }
        if let Some(date) = item.expiration_date {
            if let Some(ids) = self.by_expiration.get_mut(&date) {
                ids.remove(&item.local_id);
                if ids.is_empty() {
                    self.by_expiration.remove(&date);
                }
            }
        }
    }

    fn from_file(file: PantryFile) -> Self {
        let mut state = PantryState::default();
        let highest = file.items.iter().map(|i| i.local_id).max().unwrap_or(0);
        state.next_local_id = file.next_local_id.max(highest + 1);
        for item in file.items {
            state.items.insert(item.local_id, item.clone());
            state.index(&item);
        }
        state
    }

    fn to_file(&self) -> PantryFile {
        PantryFile {
            next_local_id: self.next_local_id,
            items: self.items.values().cloned().collect(),
        }
    }
}

pub struct PantryDb {
    path: Option<PathBuf>,
    state: Mutex<PantryState>,
    degraded: AtomicBool,
}

impl PantryDb {
    /// Open (or create) the pantry snapshot at `path`.
    ///
    /// A snapshot that no longer parses is moved aside to `<path>.bak` and
    /// the store starts empty rather than blocking the application.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::from_io)?;
        }

        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<PantryFile>(&contents) {
                Ok(file) => PantryState::from_file(file),
                Err(e) => {
                    warn!(error = %e, "Pantry snapshot is corrupt; starting empty");
                    let backup = path.with_extension("json.bak");
                    if let Err(e) = std::fs::rename(&path, &backup) {
                        debug!(error = %e, "Could not preserve corrupt pantry snapshot");
                    }
                    PantryState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PantryState::default(),
            Err(e) => return Err(StoreError::from_io(e)),
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
            degraded: AtomicBool::new(false),
        })
    }

    /// Store without a backing file. Used by tests and quota-degraded runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(PantryState::default()),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn persist_locked(&self, state: &PantryState) {
        if self.is_degraded() {
            return;
        }
        let Some(path) = &self.path else { return };

        let result = serde_json::to_string_pretty(&state.to_file())
            .map_err(StoreError::from)
            .and_then(|contents| std::fs::write(path, contents).map_err(StoreError::from_io));

        if let Err(e) = result {
            if !self.degraded.swap(true, Ordering::Relaxed) {
                warn!(
                    error = %e,
                    quota = e.is_quota(),
                    "Pantry persistence failed; keeping items in memory for this session"
                );
            }
        }
    }

    // ===== Mutations =====

    pub fn insert(&self, new: NewPantryItem) -> PantryItem {
        let mut state = mutex_lock(&self.state, "pantry_db");
        let item = PantryItem {
            local_id: state.allocate_id(),
            ingredient_id: new.ingredient_id,
            name: new.name,
            quantity: new.quantity,
            unit: new.unit,
            expiration_date: new.expiration_date,
            is_synced: false,
        };
        state.items.insert(item.local_id, item.clone());
        state.index(&item);
        self.persist_locked(&state);
        item
    }

    /// Apply a patch. A patch that changes nothing leaves the sync marker
    /// alone; any real change resets it.
    pub fn update(&self, local_id: u64, patch: &PantryItemPatch) -> Option<PantryItem> {
        let mut state = mutex_lock(&self.state, "pantry_db");
        let old = state.items.get(&local_id)?.clone();

        let mut updated = old.clone();
        if !updated.apply(patch) {
            return Some(old);
        }
        updated.is_synced = false;

        state.unindex(&old);
        state.index(&updated);
        state.items.insert(local_id, updated.clone());
        self.persist_locked(&state);
        Some(updated)
    }

    pub fn remove(&self, local_id: u64) -> Option<PantryItem> {
        let mut state = mutex_lock(&self.state, "pantry_db");
        let item = state.items.remove(&local_id)?;
        state.unindex(&item);
        self.persist_locked(&state);
        Some(item)
    }

    /// Wipe all items. The id counter keeps running so previously handed-out
    /// ids are never reassigned.
    pub fn clear(&self) {
        let mut state = mutex_lock(&self.state, "pantry_db");
        state.items.clear();
        state.by_ingredient.clear();
        state.by_expiration.clear();
        self.persist_locked(&state);
    }

    /// Mark items synced when their contents still match what was pushed.
    /// Items edited while the push was in flight keep their dirty marker.
    pub fn mark_synced_matching(&self, pushed: &[PantryItem]) {
        let mut state = mutex_lock(&self.state, "pantry_db");
        let mut marked = 0usize;
        for snapshot_item in pushed {
            if let Some(current) = state.items.get_mut(&snapshot_item.local_id) {
                if !current.is_synced && current.same_contents(snapshot_item) {
                    current.is_synced = true;
                    marked += 1;
                }
            }
        }
        if marked > 0 {
            debug!(count = marked, "Marked pantry items synced");
            self.persist_locked(&state);
        }
    }

    /// Insert remote records on cold start. Emptiness is re-checked under
    /// the lock so a local add racing the pull always wins; returns whether
    /// the records were taken.
    pub fn hydrate(&self, remote: Vec<RemotePantryItem>) -> bool {
        let mut state = mutex_lock(&self.state, "pantry_db");
        if !state.items.is_empty() {
            return false;
        }
        for record in remote {
            let item = PantryItem::from_remote(state.allocate_id(), record);
            state.items.insert(item.local_id, item.clone());
            state.index(&item);
        }
        self.persist_locked(&state);
        true
    }

    // ===== Queries =====

    pub fn get(&self, local_id: u64) -> Option<PantryItem> {
        mutex_lock(&self.state, "pantry_db").items.get(&local_id).cloned()
    }

    /// All items in insertion order.
    pub fn all(&self) -> Vec<PantryItem> {
        mutex_lock(&self.state, "pantry_db").items.values().cloned().collect()
    }

    pub fn by_ingredient(&self, ingredient_id: i64) -> Vec<PantryItem> {
        let state = mutex_lock(&self.state, "pantry_db");
        state
            .by_ingredient
            .get(&ingredient_id)
            .map(|ids| ids.iter().filter_map(|id| state.items.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Items expiring on or before `date`, soonest first.
    pub fn expiring_on_or_before(&self, date: NaiveDate) -> Vec<PantryItem> {
        let state = mutex_lock(&self.state, "pantry_db");
        state
            .by_expiration
            .range(..=date)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| state.items.get(id).cloned())
            .collect()
    }

    pub fn unsynced(&self) -> Vec<PantryItem> {
        mutex_lock(&self.state, "pantry_db")
            .items
            .values()
            .filter(|i| !i.is_synced)
            .cloned()
            .collect()
    }

    pub fn has_unsynced(&self) -> bool {
        mutex_lock(&self.state, "pantry_db").items.values().any(|i| !i.is_synced)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, "pantry_db").items.len()
    }

    pub fn is_empty(&self) -> bool {
        mutex_lock(&self.state, "pantry_db").items.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
