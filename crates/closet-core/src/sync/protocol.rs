//! Wire types for the `/browser-sync` endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{
    Bookmark, CartSession, ClientEventId, Collection, HistoryEntry, ProductInteraction, Tab,
    TimeToAction,
};
use crate::store::{AnalyticsBuffer, PendingChanges};

/// Canonical server state returned by every pull and by a push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub cart_history: Vec<CartSession>,
    /// Present only when the server tracks tabs for this account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<Tab>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab_id: Option<String>,
    pub server_timestamp: i64,
}

/// Body of `POST /browser-sync`: the whole outbox plus buffered analytics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub bookmarks: Vec<Bookmark>,
    pub deleted_bookmark_urls: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub collections: Vec<Collection>,
    pub deleted_collection_ids: Vec<String>,
    pub cart_history: Vec<CartSession>,
    pub time_to_action_events: Vec<TimeToAction>,
    pub product_interactions: Vec<ProductInteraction>,
}

impl PushRequest {
    pub fn from_outbox(outbox: &PendingChanges, analytics: &AnalyticsBuffer) -> Self {
        let outbox = outbox.clone();
        Self {
            bookmarks: outbox.bookmarks,
            deleted_bookmark_urls: outbox.deleted_bookmark_urls,
            history: outbox.history,
            collections: outbox.collections,
            deleted_collection_ids: outbox.deleted_collection_ids,
            cart_history: outbox.cart_history,
            time_to_action_events: analytics.time_to_action.clone(),
            product_interactions: analytics.product_interactions.clone(),
        }
    }

    /// The outbox partitions carried by this request.
    pub fn pending_changes(&self) -> PendingChanges {
        PendingChanges {
            bookmarks: self.bookmarks.clone(),
            deleted_bookmark_urls: self.deleted_bookmark_urls.clone(),
            history: self.history.clone(),
            collections: self.collections.clone(),
            deleted_collection_ids: self.deleted_collection_ids.clone(),
            cart_history: self.cart_history.clone(),
        }
    }

    pub fn interaction_ids(&self) -> Vec<ClientEventId> {
        self.product_interactions
            .iter()
            .map(|event| event.client_event_id)
            .collect()
    }

    pub fn time_to_action_ids(&self) -> Vec<ClientEventId> {
        self.time_to_action_events
            .iter()
            .map(|event| event.client_event_id)
            .collect()
    }

    /// Number of records carried, for logging.
    pub fn record_count(&self) -> usize {
        self.bookmarks.len()
            + self.deleted_bookmark_urls.len()
            + self.history.len()
            + self.collections.len()
            + self.deleted_collection_ids.len()
            + self.cart_history.len()
            + self.time_to_action_events.len()
            + self.product_interactions.len()
    }
}

/// Body of `DELETE /browser-sync/bookmark`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBookmarkRequest {
    pub url: String,
}
