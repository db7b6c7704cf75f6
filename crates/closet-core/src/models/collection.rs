//! Collection model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Bookmark;

/// A user-curated, ordered group of saved products. Keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Ordered, at most one item per URL
    #[serde(default)]
    pub items: Vec<Bookmark>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

/// Partial update for a collection's metadata. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl Collection {
    pub fn new(name: &str, description: Option<String>, color: Option<String>, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description,
            color,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch. Returns `false` when nothing changed.
    pub fn apply(&mut self, patch: CollectionPatch, now: i64) -> bool {
        let mut changed = false;
        if let Some(name) = patch.name.map(|name| name.trim().to_string()) {
            if !name.is_empty() && name != self.name {
                self.name = name;
                changed = true;
            }
        }
        if patch.description.is_some() && patch.description != self.description {
            self.description = patch.description;
            changed = true;
        }
        if patch.color.is_some() && patch.color != self.color {
            self.color = patch.color;
            changed = true;
        }
        if changed {
            self.updated_at = now;
        }
        changed
    }

    pub fn contains(&self, url: &str) -> bool {
        self.items.iter().any(|item| item.url == url)
    }
}
