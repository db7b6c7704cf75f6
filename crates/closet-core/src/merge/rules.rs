//! Per-entity merge rules.
//!
//! Every synchronizable entity is described by a key function and a merge
//! function; [`MergeRule::fold`] is the single keyed union used for all of
//! them, so applying the same server list twice never grows a list.

use std::collections::{HashMap, HashSet};

use crate::models::{Bookmark, CartSession, Collection, HistoryEntry, Tab};

/// How one entity type is keyed and reconciled.
pub struct MergeRule<T> {
    /// Natural key of a record
    pub key: fn(&T) -> &str,
    /// Combine `(local, server)` copies of the same key
    pub merge: fn(&T, &T) -> T,
}

impl<T> Clone for MergeRule<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MergeRule<T> {}

impl<T: Clone> MergeRule<T> {
    /// Keyed union of `local` and `server`.
    ///
    /// Local order is kept; server-only records are appended in server
    /// order. `keep_local` pins the local copy of a key (pending edits), and
    /// `reject_server` refuses server copies outright (deleted keys).
    pub fn fold(
        &self,
        local: &[T],
        server: &[T],
        keep_local: impl Fn(&str) -> bool,
        reject_server: impl Fn(&str) -> bool,
    ) -> Vec<T> {
        let key = self.key;
        let server_by_key: HashMap<&str, &T> = server
            .iter()
            .filter(|record| !reject_server(key(record)))
            .map(|record| (key(record), record))
            .collect();

        let mut seen: HashSet<&str> = HashSet::with_capacity(local.len() + server.len());
        let mut merged = Vec::with_capacity(local.len() + server_by_key.len());

        for record in local {
            let record_key = key(record);
            if !seen.insert(record_key) {
                continue;
            }
            match server_by_key.get(record_key) {
                Some(server_record) if !keep_local(record_key) => {
                    merged.push((self.merge)(record, server_record));
                }
                _ => merged.push(record.clone()),
            }
        }

        for record in server {
            let record_key = key(record);
            let Some(server_record) = server_by_key.get(record_key) else {
                continue;
            };
            if seen.insert(record_key) {
                merged.push((*server_record).clone());
            }
        }

        merged
    }
}

/// Rules for every entity carried by a server snapshot.
#[derive(Clone, Copy)]
pub struct MergeTable {
    pub bookmarks: MergeRule<Bookmark>,
    pub history: MergeRule<HistoryEntry>,
    pub collections: MergeRule<Collection>,
    pub cart_history: MergeRule<CartSession>,
    pub tabs: MergeRule<Tab>,
}

impl MergeTable {
    pub const STANDARD: Self = Self {
        bookmarks: MergeRule {
            key: bookmark_key,
            merge: server_wins::<Bookmark>,
        },
        history: MergeRule {
            key: history_key,
            merge: merge_history,
        },
        collections: MergeRule {
            key: collection_key,
            merge: server_wins::<Collection>,
        },
        cart_history: MergeRule {
            key: cart_key,
            merge: server_wins::<CartSession>,
        },
        tabs: MergeRule {
            key: tab_key,
            merge: merge_tab,
        },
    };
}

impl Default for MergeTable {
    fn default() -> Self {
        Self::STANDARD
    }
}

fn bookmark_key(bookmark: &Bookmark) -> &str {
    &bookmark.url
}

fn history_key(entry: &HistoryEntry) -> &str {
    &entry.url
}

fn collection_key(collection: &Collection) -> &str {
    &collection.id
}

fn cart_key(session: &CartSession) -> &str {
    &session.cart_url
}

fn tab_key(tab: &Tab) -> &str {
    &tab.id
}

/// The server copy already reflects everything pushed from here plus other
/// devices' edits.
pub fn server_wins<T: Clone>(_local: &T, server: &T) -> T {
    server.clone()
}

/// Field-level history merge: counters and timestamps take the maximum,
/// descriptive fields come from whichever side saw the latest visit.
pub fn merge_history(local: &HistoryEntry, server: &HistoryEntry) -> HistoryEntry {
    let mut merged = if server.visited_at >= local.visited_at {
        server.clone()
    } else {
        local.clone()
    };
    merged.visit_count = local.visit_count.max(server.visit_count);
    merged.visited_at = local.visited_at.max(server.visited_at);
    merged
}

/// Server tab state with the locally captured screenshot kept.
pub fn merge_tab(local: &Tab, server: &Tab) -> Tab {
    let mut merged = server.clone();
    if merged.screenshot.is_none() {
        merged.screenshot.clone_from(&local.screenshot);
    }
    merged
}
