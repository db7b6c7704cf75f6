//! Buffered analytics events ("gold metrics")
//!
//! Both event kinds live locally only until the server acknowledges them.

use serde::{Deserialize, Serialize};

use super::ClientEventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    SizeSelect,
    ColorSelect,
    ImageZoom,
    AddToCart,
}

/// A single interaction with a product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInteraction {
    pub client_event_id: ClientEventId,
    /// Canonical URL
    pub url: String,
    pub kind: InteractionKind,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub timestamp: i64,
}

/// Caller-supplied interaction details.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionInput {
    pub url: String,
    pub kind: InteractionKind,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl InteractionInput {
    pub fn new(url: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            url: url.into(),
            kind,
            brand: None,
            category: None,
            price: None,
            size: None,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Bookmark,
    AddToCart,
    Checkout,
    CollectionAdd,
}

/// How long the user took from landing on a page to acting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToAction {
    pub client_event_id: ClientEventId,
    /// Canonical URL
    pub url: String,
    pub action: ActionKind,
    pub page_entered_at: i64,
    pub action_at: i64,
    /// `action_at - page_entered_at`, clamped at zero
    pub duration_ms: i64,
}

impl TimeToAction {
    pub fn new(url: String, action: ActionKind, page_entered_at: i64, action_at: i64) -> Self {
        Self {
            client_event_id: ClientEventId::new(),
            url,
            action,
            page_entered_at,
            action_at,
            duration_ms: (action_at - page_entered_at).max(0),
        }
    }
}
