//! Data models shared across the cache, store, and sync layers.
//!
//! This module contains the data structures for the two domains the core
//! manages:
//!
//! - `RecipeId`, `RecipeSummary`, `RecipeDetail`: recipe feed and detail data
//! - `PantryItem`, `Unit`, `RemotePantryItem`: local pantry inventory

pub mod pantry;
pub mod recipe;

pub use pantry::{NewPantryItem, PantryItem, PantryItemPatch, RemotePantryItem, Unit};
pub use recipe::{RecipeAuthor, RecipeDetail, RecipeDraft, RecipeId, RecipeIngredient, RecipeSummary};
