//! Reconciliation of server snapshots with local state.

mod rules;

pub use rules::{merge_history, merge_tab, server_wins, MergeRule, MergeTable};

use crate::models::HistoryEntry;
use crate::store::StoreSnapshot;
use crate::sync::protocol::ServerSnapshot;

/// Folds a [`ServerSnapshot`] into a [`StoreSnapshot`].
///
/// The fold is idempotent: applying the same server snapshot twice yields the
/// same state as applying it once.
#[derive(Clone, Copy, Default)]
pub struct MergeResolver {
    table: MergeTable,
}

impl std::fmt::Debug for MergeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeResolver").finish_non_exhaustive()
    }
}

impl MergeResolver {
    pub const fn standard() -> Self {
        Self {
            table: MergeTable::STANDARD,
        }
    }

    /// Produce the merged state. `local` itself is left untouched.
    pub fn apply(&self, local: &StoreSnapshot, server: &ServerSnapshot) -> StoreSnapshot {
        let server_ts = server.server_timestamp;
        let outbox = &local.outbox;
        let ledger = &local.sync.recent_deletions;
        let mut merged = local.clone();

        let stale = ledger.predates_pruned(server_ts);

        merged.bookmarks = self.table.bookmarks.fold(
            &local.bookmarks,
            &server.bookmarks,
            |url| outbox.has_pending_bookmark(url),
            |url| {
                outbox.is_bookmark_tombstoned(url)
                    || ledger.blocks_bookmark(url, server_ts)
                    || (stale && !local.bookmarks.iter().any(|bookmark| bookmark.url == url))
            },
        );

        merged.collections = self.table.collections.fold(
            &local.collections,
            &server.collections,
            |id| outbox.has_pending_collection(id),
            |id| {
                outbox.is_collection_tombstoned(id)
                    || ledger.blocks_collection(id, server_ts)
                    || (stale && !local.collections.iter().any(|collection| collection.id == id))
            },
        );

        merged.cart_history = self.table.cart_history.fold(
            &local.cart_history,
            &server.cart_history,
            |cart_url| outbox.has_pending_cart_session(cart_url),
            |_| false,
        );

        if !local.sync.history_blocked(server_ts) {
            // Counters merge monotonically; pending visits pin only engagement.
            let mut history =
                self.table
                    .history
                    .fold(&local.history, &server.history, |_| false, |_| false);
            for entry in &mut history {
                if !outbox.has_pending_history(&entry.url) {
                    continue;
                }
                if let Some(pending) = local.history.iter().find(|l| l.url == entry.url) {
                    keep_local_engagement(entry, pending);
                }
            }
            history.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
            merged.history = history;
        }

        if let Some(server_tabs) = &server.tabs {
            merged.tabs = self
                .table
                .tabs
                .fold(&local.tabs, server_tabs, |_| false, |_| false);
            merged.active_tab_id = resolve_active_tab(
                &merged.tabs,
                local.active_tab_id.as_deref(),
                server.active_tab_id.as_deref(),
            );
        }

        merged.sync.last_sync_timestamp = Some(server_ts);
        merged.sync.recent_deletions.prune(server_ts);
        merged
    }
}

/// Engagement recorded locally but not yet pushed beats the server's copy.
fn keep_local_engagement(entry: &mut HistoryEntry, local: &HistoryEntry) {
    if local.dwell_time.is_some() {
        entry.dwell_time = local.dwell_time;
    }
    if local.scroll_depth.is_some() {
        entry.scroll_depth = local.scroll_depth;
    }
}

fn resolve_active_tab(
    tabs: &[crate::models::Tab],
    local: Option<&str>,
    server: Option<&str>,
) -> Option<String> {
    let exists = |id: &&str| tabs.iter().any(|tab| tab.id == *id);
    local
        .filter(exists)
        .or_else(|| server.filter(exists))
        .map(str::to_string)
        .or_else(|| tabs.first().map(|tab| tab.id.clone()))
}
