//! Browsing history model

use serde::{Deserialize, Serialize};

/// One visited product page. Keyed by canonical `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Canonical URL (no query string, no fragment)
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Most recent visit (Unix ms)
    pub visited_at: i64,
    /// Total visits, never decreases across merges
    pub visit_count: u32,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Time spent on the page during the latest visit, in ms
    #[serde(default)]
    pub dwell_time: Option<i64>,
    /// Deepest scroll position reached, 0.0 to 1.0
    #[serde(default)]
    pub scroll_depth: Option<f64>,
    #[serde(default)]
    pub brand: Option<String>,
}

impl HistoryEntry {
    pub fn first_visit(
        url: String,
        title: &str,
        source: Option<String>,
        session_id: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            url,
            title: title.trim().to_string(),
            source,
            visited_at: now,
            visit_count: 1,
            session_id,
            dwell_time: None,
            scroll_depth: None,
            brand: None,
        }
    }

    /// Apply a repeat visit: bump the counter and refresh the timestamp.
    pub fn revisit(&mut self, title: &str, now: i64) {
        self.visit_count = self.visit_count.saturating_add(1);
        self.visited_at = self.visited_at.max(now);
        let title = title.trim();
        if !title.is_empty() {
            self.title = title.to_string();
        }
    }
}
