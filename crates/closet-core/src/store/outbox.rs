//! Pending-change outbox and buffered analytics.
//!
//! The outbox always describes everything the server does not know yet:
//! upserts keyed by natural key, plus tombstones for deletions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{
    Bookmark, CartSession, ClientEventId, Collection, HistoryEntry, ProductInteraction, TimeToAction,
};

/// Per-entity pending changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingChanges {
    pub bookmarks: Vec<Bookmark>,
    pub deleted_bookmark_urls: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub collections: Vec<Collection>,
    pub deleted_collection_ids: Vec<String>,
    pub cart_history: Vec<CartSession>,
}

/// Analytics events waiting for their first acknowledged push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsBuffer {
    pub product_interactions: Vec<ProductInteraction>,
    pub time_to_action: Vec<TimeToAction>,
}

/// Replace the item with the same key, or append it.
fn upsert_by_key<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> &str) {
    let item_key = key(&item).to_string();
    if let Some(existing) = items.iter_mut().find(|existing| key(&**existing) == item_key) {
        *existing = item;
    } else {
        items.push(item);
    }
}

/// Drop every item that is still exactly what was sent.
fn remove_sent<T: PartialEq>(items: &mut Vec<T>, sent: &[T]) {
    items.retain(|item| !sent.contains(item));
}

/// Evict the oldest entries until at most `limit` remain.
fn evict_oldest<T>(items: &mut Vec<T>, limit: usize, age: impl Fn(&T) -> i64) -> usize {
    if items.len() <= limit {
        return 0;
    }
    let overflow = items.len() - limit;
    let mut stamps: Vec<i64> = items.iter().map(&age).collect();
    stamps.sort_unstable();
    let cutoff = stamps[overflow - 1];

    let mut evicted = 0;
    items.retain(|item| {
        if evicted < overflow && age(item) <= cutoff {
            evicted += 1;
            false
        } else {
            true
        }
    });
    evicted
}

fn cart_session_age(session: &CartSession) -> i64 {
    session.events.last().map_or(0, |event| event.timestamp)
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
            && self.deleted_bookmark_urls.is_empty()
            && self.history.is_empty()
            && self.collections.is_empty()
            && self.deleted_collection_ids.is_empty()
            && self.cart_history.is_empty()
    }

    pub fn upsert_bookmark(&mut self, bookmark: Bookmark) {
        self.deleted_bookmark_urls.retain(|url| *url != bookmark.url);
        upsert_by_key(&mut self.bookmarks, bookmark, |b| b.url.as_str());
    }

    pub fn tombstone_bookmark(&mut self, url: &str) {
        self.bookmarks.retain(|bookmark| bookmark.url != url);
        if !self.deleted_bookmark_urls.iter().any(|deleted| deleted == url) {
            self.deleted_bookmark_urls.push(url.to_string());
        }
    }

    pub fn is_bookmark_tombstoned(&self, url: &str) -> bool {
        self.deleted_bookmark_urls.iter().any(|deleted| deleted == url)
    }

    /// Forget a tombstone once the server has acknowledged the deletion.
    pub fn clear_bookmark_tombstone(&mut self, url: &str) {
        self.deleted_bookmark_urls.retain(|deleted| deleted != url);
    }

    pub fn upsert_history(&mut self, entry: HistoryEntry) {
        upsert_by_key(&mut self.history, entry, |e| e.url.as_str());
    }

    pub fn upsert_collection(&mut self, collection: Collection) {
        self.deleted_collection_ids.retain(|id| *id != collection.id);
        upsert_by_key(&mut self.collections, collection, |c| c.id.as_str());
    }

    pub fn tombstone_collection(&mut self, id: &str) {
        self.collections.retain(|collection| collection.id != id);
        if !self.deleted_collection_ids.iter().any(|deleted| deleted == id) {
            self.deleted_collection_ids.push(id.to_string());
        }
    }

    pub fn is_collection_tombstoned(&self, id: &str) -> bool {
        self.deleted_collection_ids.iter().any(|deleted| deleted == id)
    }

    pub fn upsert_cart_session(&mut self, session: CartSession) {
        upsert_by_key(&mut self.cart_history, session, |s| s.cart_url.as_str());
    }

    pub fn has_pending_bookmark(&self, url: &str) -> bool {
        self.bookmarks.iter().any(|bookmark| bookmark.url == url)
    }

    pub fn has_pending_history(&self, url: &str) -> bool {
        self.history.iter().any(|entry| entry.url == url)
    }

    pub fn has_pending_collection(&self, id: &str) -> bool {
        self.collections.iter().any(|collection| collection.id == id)
    }

    pub fn has_pending_cart_session(&self, cart_url: &str) -> bool {
        self.cart_history
            .iter()
            .any(|session| session.cart_url == cart_url)
    }

    /// Drop analytics-class partitions (history and cart timelines).
    pub fn clear_analytics(&mut self) {
        self.history.clear();
        self.cart_history.clear();
    }

    /// Remove what the server acknowledged, keeping anything edited since.
    pub fn acknowledge(&mut self, sent: &Self) {
        remove_sent(&mut self.bookmarks, &sent.bookmarks);
        remove_sent(&mut self.history, &sent.history);
        remove_sent(&mut self.collections, &sent.collections);
        remove_sent(&mut self.cart_history, &sent.cart_history);
        remove_sent(&mut self.deleted_bookmark_urls, &sent.deleted_bookmark_urls);
        remove_sent(&mut self.deleted_collection_ids, &sent.deleted_collection_ids);
    }

    /// Cap analytics-class partitions. Returns the number of evicted entries.
    pub fn enforce_limit(&mut self, limit: usize) -> usize {
        evict_oldest(&mut self.history, limit, |entry| entry.visited_at)
            + evict_oldest(&mut self.cart_history, limit, cart_session_age)
    }
}

impl AnalyticsBuffer {
    pub fn is_empty(&self) -> bool {
        self.product_interactions.is_empty() && self.time_to_action.is_empty()
    }

    pub fn clear(&mut self) {
        self.product_interactions.clear();
        self.time_to_action.clear();
    }

    /// Remove events whose ids the server acknowledged.
    pub fn acknowledge(&mut self, interactions: &[ClientEventId], time_to_action: &[ClientEventId]) {
        let interactions: HashSet<_> = interactions.iter().collect();
        let time_to_action: HashSet<_> = time_to_action.iter().collect();
        self.product_interactions
            .retain(|event| !interactions.contains(&event.client_event_id));
        self.time_to_action
            .retain(|event| !time_to_action.contains(&event.client_event_id));
    }

    /// Cap both logs. Returns the number of evicted events.
    pub fn enforce_limit(&mut self, limit: usize) -> usize {
        evict_oldest(&mut self.product_interactions, limit, |event| event.timestamp)
            + evict_oldest(&mut self.time_to_action, limit, |event| event.action_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookmarkDraft, InteractionKind};
    use pretty_assertions::assert_eq;

    fn bookmark(url: &str) -> Bookmark {
        Bookmark::from_draft(BookmarkDraft::new(url, "item"), url.to_string(), 1)
    }

    fn history(url: &str, visited_at: i64) -> HistoryEntry {
        HistoryEntry::first_visit(url.to_string(), "page", None, None, visited_at)
    }

    #[test]
    fn upsert_replaces_by_key() {
        let mut outbox = PendingChanges::default();
        let mut first = bookmark("https://a.com/1");
        outbox.upsert_bookmark(first.clone());
        first.title = "renamed".to_string();
        outbox.upsert_bookmark(first);
        assert_eq!(outbox.bookmarks.len(), 1);
        assert_eq!(outbox.bookmarks[0].title, "renamed");
    }

    #[test]
    fn tombstone_moves_upsert_and_readd_clears_tombstone() {
        let mut outbox = PendingChanges::default();
        outbox.upsert_bookmark(bookmark("https://a.com/1"));
        outbox.tombstone_bookmark("https://a.com/1");
        outbox.tombstone_bookmark("https://a.com/1");
        assert!(outbox.bookmarks.is_empty());
        assert_eq!(outbox.deleted_bookmark_urls, vec!["https://a.com/1"]);

        outbox.upsert_bookmark(bookmark("https://a.com/1"));
        assert!(outbox.deleted_bookmark_urls.is_empty());
        assert_eq!(outbox.bookmarks.len(), 1);
    }

    #[test]
    fn acknowledge_keeps_entries_edited_after_send() {
        let mut outbox = PendingChanges::default();
        outbox.upsert_history(history("https://a.com/", 1));
        outbox.upsert_history(history("https://b.com/", 2));
        outbox.tombstone_collection("c-1");
        let sent = outbox.clone();

        let mut edited = history("https://a.com/", 1);
        edited.revisit("page", 10);
        outbox.upsert_history(edited.clone());

        outbox.acknowledge(&sent);
        assert_eq!(outbox.history, vec![edited]);
        assert!(outbox.deleted_collection_ids.is_empty());
    }

    #[test]
    fn enforce_limit_evicts_oldest_history() {
        let mut outbox = PendingChanges::default();
        for (index, stamp) in [50, 10, 40, 20, 30].into_iter().enumerate() {
            outbox.upsert_history(history(&format!("https://a.com/{index}"), stamp));
        }
        assert_eq!(outbox.enforce_limit(3), 2);
        let mut remaining: Vec<_> = outbox.history.iter().map(|e| e.visited_at).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![30, 40, 50]);
        assert_eq!(outbox.enforce_limit(3), 0);
    }

    #[test]
    fn analytics_acknowledge_by_event_id() {
        let mut buffer = AnalyticsBuffer::default();
        let keep = ProductInteraction {
            client_event_id: ClientEventId::new(),
            url: "https://a.com/".to_string(),
            kind: InteractionKind::View,
            brand: None,
            category: None,
            price: None,
            size: None,
            color: None,
            timestamp: 2,
        };
        let mut sent = keep.clone();
        sent.client_event_id = ClientEventId::new();
        buffer.product_interactions.push(sent.clone());
        buffer.product_interactions.push(keep.clone());

        buffer.acknowledge(&[sent.client_event_id], &[]);
        assert_eq!(buffer.product_interactions, vec![keep]);
    }
}
