//! Domain models for recipes.
//!
//! These types mirror the backend wire format (camelCase fields) while
//! keeping idiomatic Rust naming internally. The cache layers hold read-only
//! copies of them; the backend stays the source of truth.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recipe identifier as the backend sends it: historically a numeric id,
/// a string slug on newer records. Equality and hashing coerce both forms
/// to their text representation so `5` and `"5"` address the same recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeId {
    Int(i64),
    Text(String),
}

impl RecipeId {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            RecipeId::Int(n) => Cow::Owned(n.to_string()),
            RecipeId::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl PartialEq for RecipeId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecipeId::Int(a), RecipeId::Int(b)) => a == b,
            (RecipeId::Text(a), RecipeId::Text(b)) => a == b,
            _ => self.as_text() == other.as_text(),
        }
    }
}

impl Eq for RecipeId {}

// Hash goes through the text form so it stays consistent with Eq for
// mixed Int/Text keys.
impl Hash for RecipeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_text().hash(state);
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeId::Int(n) => write!(f, "{}", n),
            RecipeId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecipeId {
    fn from(n: i64) -> Self {
        RecipeId::Int(n)
    }
}

impl From<&str> for RecipeId {
    fn from(s: &str) -> Self {
        RecipeId::Text(s.to_string())
    }
}

impl From<String> for RecipeId {
    fn from(s: String) -> Self {
        RecipeId::Text(s)
    }
}

/// Compact recipe representation used in feed lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(rename = "authorName", default)]
    pub author_name: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeAuthor {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    // Free-form on recipes ("a pinch", "2 large"); the pantry uses typed units
    #[serde(default)]
    pub unit: Option<String>,
}

/// Full recipe as served by the detail endpoint. Superset of
/// [`RecipeSummary`] with ingredients, steps, and author information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub id: RecipeId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<RecipeAuthor>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecipeDetail {
    /// Project the detail down to the shape feed lists carry.
    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            author_name: self.author.as_ref().map(|a| a.name.clone()),
            created_at: self.created_at,
        }
    }
}

/// Payload for creating a new recipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub servings: Option<u32>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_recipe_id_coerces_int_and_text() {
        assert_eq!(RecipeId::Int(5), RecipeId::Text("5".to_string()));
        assert_ne!(RecipeId::Int(5), RecipeId::Text("05".to_string()));
        assert_eq!(RecipeId::from("pasta-42"), RecipeId::from("pasta-42".to_string()));
    }

    #[test]
    fn test_recipe_id_hash_consistent_with_eq() {
        let mut map = HashMap::new();
        map.insert(RecipeId::Int(17), "carbonara");
        assert_eq!(map.get(&RecipeId::from("17")), Some(&"carbonara"));
    }

    #[test]
    fn test_recipe_id_parses_both_wire_forms() {
        let ids: Vec<RecipeId> = serde_json::from_str(r#"[12, "soup-of-the-day"]"#).unwrap();
        assert_eq!(ids[0], RecipeId::Int(12));
        assert_eq!(ids[1], RecipeId::from("soup-of-the-day"));
    }

    #[test]
    fn test_detail_summary_projection() {
        let detail = RecipeDetail {
            id: RecipeId::Int(3),
            title: "Shakshuka".to_string(),
            description: Some("Eggs in tomato sauce".to_string()),
            image_url: None,
            author: Some(RecipeAuthor {
                id: Some(9),
                name: "Nadia".to_string(),
            }),
            ingredients: vec![RecipeIngredient {
                name: "Egg".to_string(),
                quantity: Some(4.0),
                unit: None,
            }],
            steps: vec!["Simmer the sauce".to_string()],
            servings: Some(2),
            created_at: None,
            updated_at: None,
        };

        let summary = detail.summary();
        assert_eq!(summary.id, RecipeId::Int(3));
        assert_eq!(summary.title, "Shakshuka");
        assert_eq!(summary.author_name.as_deref(), Some("Nadia"));
    }
}
