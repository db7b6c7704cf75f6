//! Local store and change tracker.
//!
//! [`LocalStore`] owns every entity the app shows, plus the outbox of changes
//! the server has not acknowledged. Each mutation validates its input,
//! applies the change, and queues the same diff in the outbox.

mod metadata;
mod outbox;
mod tracking;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

pub use metadata::{DeletionLedger, SyncMetadata, DELETION_LEDGER_RETENTION_MS};
pub use outbox::{AnalyticsBuffer, PendingChanges};

use crate::config::DEFAULT_OUTBOX_LIMIT;
use crate::merge::MergeResolver;
use crate::models::{
    Bookmark, BookmarkDraft, CartSession, Collection, CollectionPatch, ConsentChoice, ConsentGate,
    ConsentStatus, HistoryEntry, Tab,
};
use crate::sync::protocol::{PushRequest, ServerSnapshot};
use crate::util::{is_http_url, normalize_text_option, Clock, SystemClock};

/// Everything persisted for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    /// Newest first
    pub bookmarks: Vec<Bookmark>,
    /// Ordered by `visited_at`, newest first
    pub history: Vec<HistoryEntry>,
    pub collections: Vec<Collection>,
    pub cart_history: Vec<CartSession>,
    pub tabs: Vec<Tab>,
    pub active_tab_id: Option<String>,
    pub consent: ConsentGate,
    pub outbox: PendingChanges,
    pub analytics: AnalyticsBuffer,
    pub sync: SyncMetadata,
}

/// In-memory store for one user, constructed explicitly and injected where
/// needed.
pub struct LocalStore {
    state: StoreSnapshot,
    clock: Arc<dyn Clock>,
    outbox_limit: usize,
    session_id: String,
    resolver: MergeResolver,
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("bookmarks", &self.state.bookmarks.len())
            .field("history", &self.state.history.len())
            .field("collections", &self.state.collections.len())
            .field("outbox_limit", &self.outbox_limit)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl LocalStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_snapshot(StoreSnapshot::default(), clock)
    }

    /// Rehydrate from a persisted snapshot.
    pub fn from_snapshot(mut state: StoreSnapshot, clock: Arc<dyn Clock>) -> Self {
        state.sync.is_syncing = false;
        Self {
            state,
            clock,
            outbox_limit: DEFAULT_OUTBOX_LIMIT,
            session_id: Uuid::new_v4().to_string(),
            resolver: MergeResolver::standard(),
        }
    }

    #[must_use]
    pub fn with_outbox_limit(mut self, limit: usize) -> Self {
        self.outbox_limit = limit.max(1);
        self
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.state
    }

    /// Swap in a freshly loaded snapshot, keeping clock and limits.
    pub fn replace_snapshot(&mut self, mut state: StoreSnapshot) {
        state.sync.is_syncing = self.state.sync.is_syncing;
        self.state = state;
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    // Bookmarks

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.state.bookmarks
    }

    pub fn bookmark(&self, url: &str) -> Option<&Bookmark> {
        self.state.bookmarks.iter().find(|bookmark| bookmark.url == url)
    }

    pub fn is_bookmarked(&self, url: &str) -> bool {
        self.bookmark(url.trim()).is_some()
    }

    /// Save a product. Returns `false` for invalid or already-saved URLs.
    pub fn add_bookmark(&mut self, draft: BookmarkDraft) -> bool {
        let url = draft.url.trim().to_string();
        if !is_http_url(&url) {
            debug!(url = %url, "rejected bookmark with non-http url");
            return false;
        }
        if self.is_bookmarked(&url) {
            return false;
        }

        let now = self.now();
        let draft = BookmarkDraft {
            source: normalize_text_option(draft.source),
            brand: normalize_text_option(draft.brand),
            category: normalize_text_option(draft.category),
            ..draft
        };
        let bookmark = Bookmark::from_draft(draft, url, now);
        self.state.sync.recent_deletions.bookmarks.remove(&bookmark.url);
        self.state.outbox.upsert_bookmark(bookmark.clone());
        self.state.bookmarks.insert(0, bookmark);
        true
    }

    /// Remove a bookmark and queue a tombstone for it.
    pub fn remove_bookmark(&mut self, url: &str) -> bool {
        let url = url.trim();
        let before = self.state.bookmarks.len();
        self.state.bookmarks.retain(|bookmark| bookmark.url != url);
        if self.state.bookmarks.len() == before {
            return false;
        }
        let now = self.now();
        self.state.outbox.tombstone_bookmark(url);
        self.state
            .sync
            .recent_deletions
            .bookmarks
            .insert(url.to_string(), now);
        true
    }

    /// Record a newly observed price for a saved product.
    pub fn update_bookmark_price(&mut self, url: &str, price: f64) -> bool {
        if !price.is_finite() || price < 0.0 {
            return false;
        }
        let now = self.now();
        let Some(bookmark) = self
            .state
            .bookmarks
            .iter_mut()
            .find(|bookmark| bookmark.url == url.trim())
        else {
            return false;
        };
        if !bookmark.observe_price(price, now) {
            return false;
        }
        let updated = bookmark.clone();
        self.state.outbox.upsert_bookmark(updated);
        true
    }

    // Collections

    pub fn collections(&self) -> &[Collection] {
        &self.state.collections
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.state
            .collections
            .iter()
            .find(|collection| collection.id == id)
    }

    /// Create a collection. Returns its id, or `None` for a blank name.
    pub fn create_collection(
        &mut self,
        name: &str,
        description: Option<String>,
        color: Option<String>,
    ) -> Option<String> {
        if name.trim().is_empty() {
            return None;
        }
        let collection = Collection::new(
            name,
            normalize_text_option(description),
            normalize_text_option(color),
            self.now(),
        );
        let id = collection.id.clone();
        self.state.outbox.upsert_collection(collection.clone());
        self.state.collections.push(collection);
        Some(id)
    }

    pub fn update_collection(&mut self, id: &str, patch: CollectionPatch) -> bool {
        let now = self.now();
        self.edit_collection(id, |collection| collection.apply(patch, now))
    }

    pub fn delete_collection(&mut self, id: &str) -> bool {
        let before = self.state.collections.len();
        self.state.collections.retain(|collection| collection.id != id);
        if self.state.collections.len() == before {
            return false;
        }
        let now = self.now();
        self.state.outbox.tombstone_collection(id);
        self.state
            .sync
            .recent_deletions
            .collections
            .insert(id.to_string(), now);
        true
    }

    /// Append an item. A collection holds at most one item per URL.
    pub fn add_to_collection(&mut self, id: &str, item: Bookmark) -> bool {
        if !is_http_url(&item.url) {
            return false;
        }
        let now = self.now();
        self.edit_collection(id, |collection| {
            if collection.contains(&item.url) {
                return false;
            }
            collection.items.push(item);
            collection.updated_at = now;
            true
        })
    }

    pub fn remove_from_collection(&mut self, id: &str, url: &str) -> bool {
        let now = self.now();
        self.edit_collection(id, |collection| {
            let before = collection.items.len();
            collection.items.retain(|item| item.url != url);
            if collection.items.len() == before {
                return false;
            }
            collection.updated_at = now;
            true
        })
    }

    fn edit_collection(&mut self, id: &str, edit: impl FnOnce(&mut Collection) -> bool) -> bool {
        let Some(collection) = self
            .state
            .collections
            .iter_mut()
            .find(|collection| collection.id == id)
        else {
            return false;
        };
        if !edit(collection) {
            return false;
        }
        let updated = collection.clone();
        self.state.outbox.upsert_collection(updated);
        true
    }

    // Tabs

    pub fn tabs(&self) -> &[Tab] {
        &self.state.tabs
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.state.active_tab_id.as_deref()
    }

    /// Open a tab and make it active.
    pub fn open_tab(&mut self, url: &str, title: &str) -> Option<String> {
        let url = url.trim();
        if !is_http_url(url) {
            return None;
        }
        let tab = Tab::new(url.to_string(), title, self.now());
        let id = tab.id.clone();
        self.state.tabs.push(tab);
        self.state.active_tab_id = Some(id.clone());
        Some(id)
    }

    /// Close a tab. Closing the active tab activates its neighbour.
    pub fn close_tab(&mut self, id: &str) -> bool {
        let Some(index) = self.state.tabs.iter().position(|tab| tab.id == id) else {
            return false;
        };
        self.state.tabs.remove(index);
        if self.state.active_tab_id.as_deref() == Some(id) {
            let next = index.min(self.state.tabs.len().saturating_sub(1));
            self.state.active_tab_id = self.state.tabs.get(next).map(|tab| tab.id.clone());
        }
        true
    }

    pub fn set_active_tab(&mut self, id: &str) -> bool {
        let now = self.now();
        let Some(tab) = self.state.tabs.iter_mut().find(|tab| tab.id == id) else {
            return false;
        };
        tab.last_active_at = now;
        self.state.active_tab_id = Some(id.to_string());
        true
    }

    pub fn set_tab_screenshot(&mut self, id: &str, screenshot: Option<String>) -> bool {
        let Some(tab) = self.state.tabs.iter_mut().find(|tab| tab.id == id) else {
            return false;
        };
        tab.screenshot = screenshot;
        true
    }

    // Consent

    pub const fn consent(&self) -> ConsentStatus {
        self.state.consent.status()
    }

    pub fn set_consent(&mut self, choice: ConsentChoice) {
        self.state.consent.set_consent(choice);
        debug!(consent = ?self.state.consent.status(), "analytics consent updated");
    }

    pub const fn is_tracking_enabled(&self) -> bool {
        self.state.consent.is_tracking_enabled()
    }

    // Outbox and sync hooks

    pub fn pending_changes(&self) -> &PendingChanges {
        &self.state.outbox
    }

    pub fn analytics_buffer(&self) -> &AnalyticsBuffer {
        &self.state.analytics
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.state.outbox.is_empty() || !self.state.analytics.is_empty()
    }

    pub fn sync_metadata(&self) -> &SyncMetadata {
        &self.state.sync
    }

    /// Build the push body, or `None` when there is nothing to send.
    pub fn prepare_push(&self) -> Option<PushRequest> {
        self.has_pending_changes()
            .then(|| PushRequest::from_outbox(&self.state.outbox, &self.state.analytics))
    }

    /// Drop exactly what `sent` carried; edits made meanwhile stay queued.
    pub fn acknowledge_push(&mut self, sent: &PushRequest) {
        self.state.outbox.acknowledge(&sent.pending_changes());
        self.state
            .analytics
            .acknowledge(&sent.interaction_ids(), &sent.time_to_action_ids());
    }

    /// A full pull is needed without a sync cursor or when local state is
    /// empty.
    pub fn needs_full_sync(&self) -> bool {
        self.state.sync.last_sync_timestamp.is_none()
            || (self.state.bookmarks.is_empty()
                && self.state.history.is_empty()
                && self.state.collections.is_empty())
    }

    pub fn apply_server_sync(&mut self, snapshot: &ServerSnapshot) {
        self.state = self.resolver.apply(&self.state, snapshot);
        debug!(
            server_timestamp = snapshot.server_timestamp,
            bookmarks = self.state.bookmarks.len(),
            history = self.state.history.len(),
            "merged server snapshot"
        );
    }

    /// The server confirmed a single-bookmark delete. The ledger entry stays.
    pub fn acknowledge_bookmark_deletion(&mut self, url: &str) {
        self.state.outbox.clear_bookmark_tombstone(url);
    }

    pub fn begin_sync(&mut self) {
        self.state.sync.is_syncing = true;
    }

    /// Leave the syncing state, recording `error` as the last failure.
    pub fn finish_sync(&mut self, error: Option<String>) {
        self.state.sync.is_syncing = false;
        self.state.sync.sync_error = error;
    }

    fn enforce_outbox_limit(&mut self) {
        let evicted = self.state.outbox.enforce_limit(self.outbox_limit)
            + self.state.analytics.enforce_limit(self.outbox_limit);
        if evicted > 0 {
            warn!(
                evicted,
                limit = self.outbox_limit,
                "outbox over capacity; dropped oldest analytics entries"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::util::ManualClock;
    use pretty_assertions::assert_eq;

    pub(crate) fn store_at(now: i64) -> (LocalStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        (LocalStore::new(clock.clone()), clock)
    }

    #[test]
    fn bookmark_urls_are_unique_and_validated() {
        let (mut store, _) = store_at(1_000);
        assert!(store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A")));
        assert!(!store.add_bookmark(BookmarkDraft::new(" https://shop.com/a ", "dup")));
        assert!(!store.add_bookmark(BookmarkDraft::new("ftp://shop.com/a", "bad")));
        assert_eq!(store.bookmarks().len(), 1);
        assert_eq!(store.pending_changes().bookmarks.len(), 1);
    }

    #[test]
    fn bookmark_with_query_keeps_its_url() {
        let (mut store, _) = store_at(1_000);
        assert!(store.add_bookmark(BookmarkDraft::new("https://shop.com/a?variant=2", "A")));
        assert!(store.is_bookmarked("https://shop.com/a?variant=2"));
    }

    #[test]
    fn remove_bookmark_tombstones_and_readd_clears_ledger() {
        let (mut store, clock) = store_at(1_000);
        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A"));
        clock.set(2_000);
        assert!(store.remove_bookmark("https://shop.com/a"));
        assert!(!store.remove_bookmark("https://shop.com/a"));
        assert!(store.pending_changes().bookmarks.is_empty());
        assert_eq!(
            store.pending_changes().deleted_bookmark_urls,
            vec!["https://shop.com/a"]
        );
        assert_eq!(
            store
                .sync_metadata()
                .recent_deletions
                .bookmarks
                .get("https://shop.com/a"),
            Some(&2_000)
        );

        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A again"));
        assert!(store.pending_changes().deleted_bookmark_urls.is_empty());
        assert!(store.sync_metadata().recent_deletions.bookmarks.is_empty());
    }

    #[test]
    fn price_updates_flow_to_outbox() {
        let (mut store, _) = store_at(1_000);
        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A"));
        assert!(store.update_bookmark_price("https://shop.com/a", 80.0));
        assert!(!store.update_bookmark_price("https://shop.com/a", 80.0));
        assert!(!store.update_bookmark_price("https://shop.com/a", f64::NAN));
        assert!(!store.update_bookmark_price("https://shop.com/missing", 10.0));
        assert_eq!(store.pending_changes().bookmarks[0].price, Some(80.0));
    }

    #[test]
    fn collection_lifecycle() {
        let (mut store, clock) = store_at(1_000);
        assert_eq!(store.create_collection("   ", None, None), None);
        let id = store
            .create_collection("Winter", Some(" ".to_string()), None)
            .unwrap();
        assert_eq!(store.collection(&id).unwrap().description, None);

        let item = Bookmark::from_draft(
            BookmarkDraft::new("https://shop.com/coat", "Coat"),
            "https://shop.com/coat".to_string(),
            1_000,
        );
        clock.set(1_500);
        assert!(store.add_to_collection(&id, item.clone()));
        assert!(!store.add_to_collection(&id, item));
        assert_eq!(store.collection(&id).unwrap().updated_at, 1_500);

        let patch = CollectionPatch {
            name: Some("Winter 26".to_string()),
            ..CollectionPatch::default()
        };
        assert!(store.update_collection(&id, patch));
        assert!(store.remove_from_collection(&id, "https://shop.com/coat"));
        assert!(!store.remove_from_collection(&id, "https://shop.com/coat"));

        assert!(store.delete_collection(&id));
        assert!(store.collections().is_empty());
        assert!(store.pending_changes().collections.is_empty());
        assert_eq!(store.pending_changes().deleted_collection_ids, vec![id]);
    }

    #[test]
    fn closing_active_tab_activates_neighbour() {
        let (mut store, _) = store_at(1_000);
        let first = store.open_tab("https://a.com/", "A").unwrap();
        let second = store.open_tab("https://b.com/", "B").unwrap();
        assert_eq!(store.active_tab_id(), Some(second.as_str()));
        assert!(store.open_tab("javascript:alert(1)", "x").is_none());

        assert!(store.close_tab(&second));
        assert_eq!(store.active_tab_id(), Some(first.as_str()));
        assert!(store.close_tab(&first));
        assert_eq!(store.active_tab_id(), None);
    }

    #[test]
    fn prepare_push_is_none_when_idle() {
        let (mut store, _) = store_at(1_000);
        assert!(store.prepare_push().is_none());
        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A"));
        let request = store.prepare_push().unwrap();
        store.acknowledge_push(&request);
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn edit_during_push_survives_acknowledgement() {
        let (mut store, _) = store_at(1_000);
        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A"));
        let request = store.prepare_push().unwrap();
        store.update_bookmark_price("https://shop.com/a", 42.0);

        store.acknowledge_push(&request);
        assert_eq!(store.pending_changes().bookmarks.len(), 1);
        assert_eq!(store.pending_changes().bookmarks[0].price, Some(42.0));
    }

    #[test]
    fn needs_full_sync_until_cursor_and_data_exist() {
        let (mut store, _) = store_at(1_000);
        assert!(store.needs_full_sync());
        store.apply_server_sync(&ServerSnapshot {
            server_timestamp: 5,
            ..ServerSnapshot::default()
        });
        assert!(store.needs_full_sync());
        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A"));
        assert!(!store.needs_full_sync());
    }

    #[test]
    fn snapshot_roundtrip_drops_syncing_flag() {
        let (mut store, clock) = store_at(1_000);
        store.add_bookmark(BookmarkDraft::new("https://shop.com/a", "A"));
        store.begin_sync();
        let json = serde_json::to_string(store.snapshot()).unwrap();
        let restored: StoreSnapshot = serde_json::from_str(&json).unwrap();
        let restored = LocalStore::from_snapshot(restored, clock);
        assert!(!restored.sync_metadata().is_syncing);
        assert_eq!(restored.bookmarks(), store.bookmarks());
    }
}
