//! Domain models for the local pantry inventory.
//!
//! Pantry items live primarily on the device. `local_id` is assigned by the
//! local store and never leaves it; the remote backend only sees the content
//! fields via [`RemotePantryItem`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Measurement unit for pantry quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Piece,
    Kg,
    G,
    Liter,
    Ml,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Piece => write!(f, "pcs"),
            Unit::Kg => write!(f, "kg"),
            Unit::G => write!(f, "g"),
            Unit::Liter => write!(f, "l"),
            Unit::Ml => write!(f, "ml"),
        }
    }
}

/// A pantry item as stored on the device.
///
/// `is_synced` starts false on every local mutation and flips to true only
/// after the remote store confirmed a snapshot containing exactly these
/// field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryItem {
    #[serde(rename = "localId")]
    pub local_id: u64,
    #[serde(rename = "ingredientId")]
    pub ingredient_id: i64,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(rename = "expirationDate", default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(rename = "isSynced", default)]
    pub is_synced: bool,
}

impl PantryItem {
    /// Content equality, ignoring the sync marker. Used after a push to
    /// decide whether an item may be marked synced or was edited mid-flight.
    pub fn same_contents(&self, other: &PantryItem) -> bool {
        self.ingredient_id == other.ingredient_id
            && self.name == other.name
            && self.quantity == other.quantity
            && self.unit == other.unit
            && self.expiration_date == other.expiration_date
    }

    /// Apply a partial update. Returns whether anything actually changed.
    pub fn apply(&mut self, patch: &PantryItemPatch) -> bool {
        let mut changed = false;
        if let Some(name) = &patch.name {
            if self.name != *name {
                self.name = name.clone();
                changed = true;
            }
        }
        if let Some(quantity) = patch.quantity {
            if self.quantity != quantity {
                self.quantity = quantity;
                changed = true;
            }
        }
        if let Some(unit) = patch.unit {
            if self.unit != unit {
                self.unit = unit;
                changed = true;
            }
        }
        if let Some(expiration) = patch.expiration_date {
            if self.expiration_date != expiration {
                self.expiration_date = expiration;
                changed = true;
            }
        }
        changed
    }

    pub fn to_remote(&self) -> RemotePantryItem {
        RemotePantryItem {
            ingredient_id: self.ingredient_id,
            name: self.name.clone(),
            quantity: self.quantity,
            unit: self.unit,
            expiration_date: self.expiration_date,
        }
    }

    /// Build a local item from a remote record during cold-start hydration.
    /// Hydrated items are in sync with the backend by definition.
    pub fn from_remote(local_id: u64, remote: RemotePantryItem) -> Self {
        Self {
            local_id,
            ingredient_id: remote.ingredient_id,
            name: remote.name,
            quantity: remote.quantity,
            unit: remote.unit,
            expiration_date: remote.expiration_date,
            is_synced: true,
        }
    }
}

/// Input for adding a pantry item. The store assigns `local_id`.
#[derive(Debug, Clone, Default)]
pub struct NewPantryItem {
    pub ingredient_id: i64,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub expiration_date: Option<NaiveDate>,
}

/// Partial update for a pantry item. `None` leaves a field unchanged;
/// for the expiration date, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PantryItemPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub expiration_date: Option<Option<NaiveDate>>,
}

/// Pantry item as the backend exchanges it: no local id, no sync marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePantryItem {
    #[serde(rename = "ingredientId")]
    pub ingredient_id: i64,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(rename = "expirationDate", default)]
    pub expiration_date: Option<NaiveDate>,
}

// ============================================================================
// Tests
// ============================================================================
