//! Bookmark model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single observed price for a bookmarked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub price: f64,
    /// Observation timestamp (Unix ms)
    pub recorded_at: i64,
}

/// A saved product page. Keyed by `url`; at most one bookmark per URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Client-generated identifier
    pub id: String,
    /// Natural key
    pub url: String,
    pub title: String,
    /// Shop or site the product came from
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub sizes_viewed: Vec<String>,
    #[serde(default)]
    pub colors_viewed: Vec<String>,
    /// Creation timestamp (Unix ms)
    pub added_at: i64,
}

/// Caller-supplied fields for a new bookmark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkDraft {
    pub url: String,
    pub title: String,
    pub source: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
    pub category: Option<String>,
}

impl BookmarkDraft {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Bookmark {
    /// Build a bookmark from a draft whose URL has already been validated.
    #[must_use]
    pub fn from_draft(draft: BookmarkDraft, url: String, now: i64) -> Self {
        let price_history = draft
            .price
            .map(|price| {
                vec![PricePoint {
                    price,
                    recorded_at: now,
                }]
            })
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            url,
            title: draft.title.trim().to_string(),
            source: draft.source,
            price: draft.price,
            price_history,
            brand: draft.brand,
            category: draft.category,
            view_count: 0,
            sizes_viewed: Vec::new(),
            colors_viewed: Vec::new(),
            added_at: now,
        }
    }

    /// Record a newly observed price. Returns `false` when the price is
    /// unchanged.
    #[allow(clippy::float_cmp)]
    pub fn observe_price(&mut self, price: f64, now: i64) -> bool {
        if self.price == Some(price) {
            return false;
        }
        self.price = Some(price);
        self.price_history.push(PricePoint {
            price,
            recorded_at: now,
        });
        true
    }

    /// Remember a size the user looked at, without duplicates.
    pub fn note_size_viewed(&mut self, size: &str) -> bool {
        push_unique(&mut self.sizes_viewed, size)
    }

    /// Remember a color the user looked at, without duplicates.
    pub fn note_color_viewed(&mut self, color: &str) -> bool {
        push_unique(&mut self.colors_viewed, color)
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || values.iter().any(|existing| existing.eq_ignore_ascii_case(value)) {
        return false;
    }
    values.push(value.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark() -> Bookmark {
        let mut draft = BookmarkDraft::new("https://shop.example.com/coat", " Wool coat ");
        draft.price = Some(120.0);
        Bookmark::from_draft(draft, "https://shop.example.com/coat".to_string(), 1_000)
    }

    #[test]
    fn from_draft_seeds_price_history() {
        let bookmark = bookmark();
        assert_eq!(bookmark.title, "Wool coat");
        assert_eq!(bookmark.price_history.len(), 1);
        assert_eq!(bookmark.added_at, 1_000);
        assert!(!bookmark.id.is_empty());
    }

    #[test]
    fn observe_price_appends_only_on_change() {
        let mut bookmark = bookmark();
        assert!(!bookmark.observe_price(120.0, 2_000));
        assert!(bookmark.observe_price(99.0, 3_000));
        assert_eq!(bookmark.price, Some(99.0));
        assert_eq!(bookmark.price_history.len(), 2);
        assert_eq!(bookmark.price_history[1].recorded_at, 3_000);
    }

    #[test]
    fn sizes_viewed_are_deduplicated_case_insensitively() {
        let mut bookmark = bookmark();
        assert!(bookmark.note_size_viewed("M"));
        assert!(!bookmark.note_size_viewed("m"));
        assert!(!bookmark.note_size_viewed("  "));
        assert_eq!(bookmark.sizes_viewed, vec!["M"]);
    }

    #[test]
    fn serializes_camel_case_fields() {
        let json = serde_json::to_value(bookmark()).unwrap();
        assert!(json.get("priceHistory").is_some());
        assert!(json.get("addedAt").is_some());
        assert!(json.get("viewCount").is_some());
    }
}
