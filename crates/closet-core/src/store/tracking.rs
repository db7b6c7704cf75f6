//! Consent-gated analytics: history, cart timelines, product interactions
//! and time-to-action.
//!
//! Every append here is a silent no-op when tracking is disabled or the URL
//! does not canonicalize.

use tracing::debug;

use super::LocalStore;
use crate::models::{
    new_event_id, ActionKind, CartEvent, CartEventInput, CartSession, HistoryEntry,
    InteractionInput, InteractionKind, ProductInteraction, TimeToAction,
};
use crate::util::{canonicalize_url, normalize_text_option};

impl LocalStore {
    fn tracked_url(&self, raw: &str) -> Option<String> {
        if !self.is_tracking_enabled() {
            return None;
        }
        let url = canonicalize_url(raw);
        if url.is_none() {
            debug!("dropped analytics event with invalid url");
        }
        url
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }

    pub fn cart_history(&self) -> &[CartSession] {
        &self.state.cart_history
    }

    /// Record a page visit. A repeat visit bumps the existing entry.
    pub fn add_to_history(&mut self, url: &str, title: &str, source: Option<String>) -> bool {
        let Some(url) = self.tracked_url(url) else {
            return false;
        };
        let now = self.now();
        let history = &mut self.state.history;

        let entry = match history.iter().position(|entry| entry.url == url) {
            Some(index) => {
                let mut entry = history.remove(index);
                entry.revisit(title, now);
                entry
            }
            None => HistoryEntry::first_visit(
                url,
                title,
                normalize_text_option(source),
                Some(self.session_id.clone()),
                now,
            ),
        };
        history.insert(0, entry.clone());
        self.state.outbox.upsert_history(entry);
        self.enforce_outbox_limit();
        true
    }

    /// Attach dwell time and scroll depth to the latest visit of a page.
    pub fn record_history_engagement(
        &mut self,
        url: &str,
        dwell_ms: i64,
        scroll_depth: Option<f64>,
    ) -> bool {
        let Some(url) = self.tracked_url(url) else {
            return false;
        };
        let Some(entry) = self.state.history.iter_mut().find(|entry| entry.url == url) else {
            return false;
        };
        entry.dwell_time = Some(dwell_ms.max(0));
        if let Some(depth) = scroll_depth.filter(|depth| depth.is_finite()) {
            let depth = depth.clamp(0.0, 1.0);
            entry.scroll_depth = Some(entry.scroll_depth.map_or(depth, |seen| seen.max(depth)));
        }
        let updated = entry.clone();
        self.state.outbox.upsert_history(updated);
        true
    }

    /// Wipe local history and block older server history from returning.
    pub fn clear_history(&mut self) {
        self.state.history.clear();
        self.state.outbox.history.clear();
        self.state.sync.history_cleared_at = Some(self.now());
    }

    /// Append a cart event, dropping duplicate deliveries.
    pub fn record_cart_event(&mut self, input: CartEventInput) -> bool {
        let Some(cart_url) = self.tracked_url(&input.cart_url) else {
            return false;
        };
        let at = input.timestamp.unwrap_or_else(|| self.now());
        let sessions = &mut self.state.cart_history;
        let index = match sessions.iter().position(|session| session.cart_url == cart_url) {
            Some(index) => index,
            None => {
                sessions.push(CartSession::new(cart_url));
                sessions.len() - 1
            }
        };
        let session = &mut sessions[index];

        if session.is_duplicate(input.event_type, input.cart_value, at) {
            debug!(cart_url = %session.cart_url, event = ?input.event_type, "dropped duplicate cart event");
            return false;
        }
        session.push(CartEvent {
            client_event_id: new_event_id(),
            event_type: input.event_type,
            timestamp: at,
            cart_value: input.cart_value,
            items: input.items,
        });
        let updated = session.clone();
        self.state.outbox.upsert_cart_session(updated);
        self.enforce_outbox_limit();
        true
    }

    /// Flag idle, uncompleted carts as abandoned. Returns how many flipped.
    pub fn mark_abandoned_carts(&mut self) -> usize {
        let now = self.now();
        let mut flipped = Vec::new();
        for session in &mut self.state.cart_history {
            if session.mark_abandoned_if_idle(now) {
                flipped.push(session.clone());
            }
        }
        let count = flipped.len();
        for session in flipped {
            self.state.outbox.upsert_cart_session(session);
        }
        count
    }

    /// Log a product interaction and fold it into the matching bookmark.
    pub fn record_product_interaction(&mut self, input: InteractionInput) -> bool {
        let Some(url) = self.tracked_url(&input.url) else {
            return false;
        };
        let now = self.now();
        let size = normalize_text_option(input.size);
        let color = normalize_text_option(input.color);

        if let Some(bookmark) = self
            .state
            .bookmarks
            .iter_mut()
            .find(|bookmark| canonicalize_url(&bookmark.url).as_deref() == Some(url.as_str()))
        {
            let changed = match (input.kind, size.as_deref(), color.as_deref()) {
                (InteractionKind::View, _, _) => {
                    bookmark.view_count = bookmark.view_count.saturating_add(1);
                    true
                }
                (InteractionKind::SizeSelect, Some(size), _) => bookmark.note_size_viewed(size),
                (InteractionKind::ColorSelect, _, Some(color)) => bookmark.note_color_viewed(color),
                _ => false,
            };
            if changed {
                let updated = bookmark.clone();
                self.state.outbox.upsert_bookmark(updated);
            }
        }

        self.state.analytics.product_interactions.push(ProductInteraction {
            client_event_id: new_event_id(),
            url,
            kind: input.kind,
            brand: normalize_text_option(input.brand),
            category: normalize_text_option(input.category),
            price: input.price.filter(|price| price.is_finite()),
            size,
            color,
            timestamp: now,
        });
        self.enforce_outbox_limit();
        true
    }

    /// Log how long it took from landing on `url` to `action`.
    pub fn record_time_to_action(
        &mut self,
        url: &str,
        action: ActionKind,
        page_entered_at: i64,
    ) -> bool {
        let Some(url) = self.tracked_url(url) else {
            return false;
        };
        let event = TimeToAction::new(url, action, page_entered_at, self.now());
        self.state.analytics.time_to_action.push(event);
        self.enforce_outbox_limit();
        true
    }

    /// Drop every analytics-class record, locally and from the outbox.
    pub fn clear_analytics(&mut self) {
        self.state.history.clear();
        self.state.cart_history.clear();
        self.state.outbox.clear_analytics();
        self.state.analytics.clear();
        self.state.sync.history_cleared_at = Some(self.now());
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{
        ActionKind, BookmarkDraft, CartEventInput, CartEventType, ConsentChoice, InteractionInput,
        InteractionKind,
    };
    use crate::store::tests::store_at;
    use crate::store::LocalStore;
    use pretty_assertions::assert_eq;

    fn tracking_store(now: i64) -> (LocalStore, std::sync::Arc<crate::util::ManualClock>) {
        let (mut store, clock) = store_at(now);
        store.set_consent(ConsentChoice::Accepted);
        (store, clock)
    }

    #[test]
    fn nothing_is_tracked_without_consent() {
        for choice in [None, Some(ConsentChoice::Declined)] {
            let (mut store, _) = store_at(1_000);
            if let Some(choice) = choice {
                store.set_consent(choice);
            }
            assert!(!store.add_to_history("https://a.com/p", "P", None));
            assert!(!store.record_cart_event(CartEventInput::new(
                CartEventType::Add,
                "https://a.com/cart"
            )));
            assert!(!store.record_product_interaction(InteractionInput::new(
                "https://a.com/p",
                InteractionKind::View
            )));
            assert!(!store.record_time_to_action("https://a.com/p", ActionKind::Checkout, 0));
            assert!(store.history().is_empty());
            assert!(store.cart_history().is_empty());
            assert!(!store.has_pending_changes());
        }
    }

    #[test]
    fn repeat_visit_updates_single_entry() {
        let (mut store, clock) = tracking_store(1_000);
        assert!(store.add_to_history("https://a.com/p?utm=1", "P", None));
        clock.set(2_000);
        assert!(store.add_to_history("https://a.com/p#reviews", "P", None));

        assert_eq!(store.history().len(), 1);
        let entry = &store.history()[0];
        assert_eq!(entry.url, "https://a.com/p");
        assert_eq!(entry.visit_count, 2);
        assert_eq!(entry.visited_at, 2_000);
        assert_eq!(store.pending_changes().history, store.history().to_vec());
    }

    #[test]
    fn invalid_analytics_urls_are_dropped_silently() {
        let (mut store, _) = tracking_store(1_000);
        assert!(!store.add_to_history("not a url", "P", None));
        assert!(!store.add_to_history("mailto:a@b.com", "P", None));
        assert!(!store.has_pending_changes());
    }

    #[test]
    fn engagement_keeps_deepest_scroll() {
        let (mut store, _) = tracking_store(1_000);
        store.add_to_history("https://a.com/p", "P", None);
        assert!(store.record_history_engagement("https://a.com/p", 4_000, Some(0.8)));
        assert!(store.record_history_engagement("https://a.com/p", -5, Some(0.3)));
        let entry = &store.history()[0];
        assert_eq!(entry.scroll_depth, Some(0.8));
        assert_eq!(entry.dwell_time, Some(0));
        assert!(!store.record_history_engagement("https://a.com/unknown", 1, None));
    }

    #[test]
    fn duplicate_cart_event_within_window_is_dropped() {
        let (mut store, _) = tracking_store(1_000);
        let add = CartEventInput::new(CartEventType::Add, "https://a.com/cart").with_value(59.0);
        assert!(store.record_cart_event(add.clone().at(10_000)));
        assert!(!store.record_cart_event(add.clone().at(15_000)));
        assert!(store.record_cart_event(add.at(50_000)));

        let session = &store.cart_history()[0];
        assert_eq!(session.events.len(), 2);
        assert_eq!(store.pending_changes().cart_history[0], *session);
    }

    #[test]
    fn idle_carts_are_marked_abandoned() {
        let (mut store, clock) = tracking_store(0);
        store.record_cart_event(CartEventInput::new(CartEventType::Add, "https://a.com/cart"));
        clock.set(31 * 60 * 1_000);
        assert_eq!(store.mark_abandoned_carts(), 1);
        assert_eq!(store.mark_abandoned_carts(), 0);
        assert!(store.pending_changes().cart_history[0].abandoned);
    }

    #[test]
    fn interactions_update_matching_bookmark() {
        let (mut store, _) = tracking_store(1_000);
        store.add_bookmark(BookmarkDraft::new("https://a.com/p?color=red", "P"));

        assert!(store.record_product_interaction(InteractionInput::new(
            "https://a.com/p",
            InteractionKind::View
        )));
        let mut size = InteractionInput::new("https://a.com/p", InteractionKind::SizeSelect);
        size.size = Some("M".to_string());
        assert!(store.record_product_interaction(size));

        let bookmark = &store.bookmarks()[0];
        assert_eq!(bookmark.view_count, 1);
        assert_eq!(bookmark.sizes_viewed, vec!["M"]);
        assert_eq!(store.pending_changes().bookmarks[0], *bookmark);
        assert_eq!(store.analytics_buffer().product_interactions.len(), 2);
    }

    #[test]
    fn analytics_outbox_is_bounded() {
        let (store, clock) = tracking_store(0);
        let mut store = store.with_outbox_limit(3);
        for index in 0..5 {
            clock.set(index * 1_000);
            store.add_to_history(&format!("https://a.com/{index}"), "P", None);
            store.record_time_to_action("https://a.com/p", ActionKind::Bookmark, 0);
        }
        assert_eq!(store.history().len(), 5);
        assert_eq!(store.pending_changes().history.len(), 3);
        assert_eq!(store.analytics_buffer().time_to_action.len(), 3);
        assert_eq!(store.analytics_buffer().time_to_action[0].action_at, 2_000);
    }

    #[test]
    fn clearing_analytics_empties_every_partition() {
        let (mut store, clock) = tracking_store(1_000);
        store.add_to_history("https://a.com/p", "P", None);
        store.record_time_to_action("https://a.com/p", ActionKind::AddToCart, 500);
        clock.set(9_000);
        store.clear_analytics();
        assert!(store.history().is_empty());
        assert!(!store.has_pending_changes());
        assert_eq!(store.sync_metadata().history_cleared_at, Some(9_000));
    }
}
