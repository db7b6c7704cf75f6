//! Sync bookkeeping persisted alongside the entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How long a deletion keeps guarding against stale snapshots after the
/// server has moved past it.
pub const DELETION_LEDGER_RETENTION_MS: i64 = 7 * 24 * 60 * 60 * 1_000;

/// Deletion times for bookmarks and collections.
///
/// Unlike outbox tombstones these survive acknowledgement, so a snapshot
/// older than the deletion still cannot resurrect the entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletionLedger {
    pub bookmarks: BTreeMap<String, i64>,
    pub collections: BTreeMap<String, i64>,
    /// Latest `deletedAt` among pruned entries. Snapshots stamped before it
    /// may still carry a pruned key, so they cannot introduce new keys.
    pub pruned_before: i64,
}

impl DeletionLedger {
    /// Whether a server copy stamped `server_timestamp` predates the deletion.
    pub fn blocks_bookmark(&self, url: &str, server_timestamp: i64) -> bool {
        self.bookmarks
            .get(url)
            .is_some_and(|deleted_at| *deleted_at > server_timestamp)
    }

    pub fn blocks_collection(&self, id: &str, server_timestamp: i64) -> bool {
        self.collections
            .get(id)
            .is_some_and(|deleted_at| *deleted_at > server_timestamp)
    }

    /// Drop entries the server has been past for longer than the retention.
    pub fn prune(&mut self, server_timestamp: i64) {
        let still_guarding = |deleted_at: i64| {
            deleted_at.saturating_add(DELETION_LEDGER_RETENTION_MS) >= server_timestamp
        };
        let mut pruned_before = self.pruned_before;
        for deleted_at in self.bookmarks.values().chain(self.collections.values()) {
            if !still_guarding(*deleted_at) {
                pruned_before = pruned_before.max(*deleted_at);
            }
        }
        self.pruned_before = pruned_before;
        self.bookmarks.retain(|_, deleted_at| still_guarding(*deleted_at));
        self.collections.retain(|_, deleted_at| still_guarding(*deleted_at));
    }

    /// Whether a snapshot stamped `server_timestamp` predates a pruned
    /// deletion, so keys unknown locally must not be adopted from it.
    pub const fn predates_pruned(&self, server_timestamp: i64) -> bool {
        self.pruned_before > server_timestamp
    }
}

/// Sync metadata for the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncMetadata {
    /// `serverTimestamp` of the last merged snapshot
    pub last_sync_timestamp: Option<i64>,
    /// Display flag; never persisted as `true`
    #[serde(skip)]
    pub is_syncing: bool,
    /// Human-readable reason the last sync failed
    pub sync_error: Option<String>,
    /// Time of the last explicit history clear
    pub history_cleared_at: Option<i64>,
    pub recent_deletions: DeletionLedger,
}

impl SyncMetadata {
    /// Whether a snapshot stamped `server_timestamp` predates the last
    /// history clear and therefore must not repopulate history.
    pub fn history_blocked(&self, server_timestamp: i64) -> bool {
        self.history_cleared_at
            .is_some_and(|cleared_at| cleared_at > server_timestamp)
    }
}
