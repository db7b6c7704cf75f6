//! In-app browser tab model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An open in-app browser tab. Ephemeral UI state, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Local-only preview image; the server never stores screenshots
    #[serde(default)]
    pub screenshot: Option<String>,
    pub created_at: i64,
    pub last_active_at: i64,
}

impl Tab {
    pub fn new(url: String, title: &str, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url,
            title: title.trim().to_string(),
            screenshot: None,
            created_at: now,
            last_active_at: now,
        }
    }
}
