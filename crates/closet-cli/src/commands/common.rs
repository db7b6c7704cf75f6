use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use closet_core::db::{Database, LibSqlStateRepository};
use closet_core::models::{Bookmark, Collection, ConsentStatus, HistoryEntry};
use closet_core::sync::protocol::{PushRequest, ServerSnapshot};
use closet_core::sync::{
    HttpSyncTransport, PullKind, StaticTokenProvider, SyncTransport, TransportError,
    TransportResult,
};
use closet_core::{LocalStore, SyncConfig, SyncOrchestrator, SyncOutcome};
use serde::Serialize;
use tracing::debug;

use crate::error::CliError;

const ENV_DB_PATH: &str = "CLOSET_DB_PATH";
const ENV_ACCESS_TOKEN: &str = "CLOSET_ACCESS_TOKEN";

pub type Orchestrator =
    SyncOrchestrator<ConfiguredTransport, StaticTokenProvider, LibSqlStateRepository>;

/// HTTP transport when an API URL is configured; every call fails otherwise.
pub struct ConfiguredTransport(Option<HttpSyncTransport>);

impl ConfiguredTransport {
    pub fn from_config(config: &SyncConfig) -> Result<Self, CliError> {
        if config.api_base_url.is_none() {
            return Ok(Self(None));
        }
        Ok(Self(Some(HttpSyncTransport::from_config(config)?)))
    }

    pub const fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    fn http(&self) -> TransportResult<&HttpSyncTransport> {
        self.0.as_ref().ok_or_else(|| {
            TransportError::InvalidConfiguration("CLOSET_API_BASE_URL is not set".to_string())
        })
    }
}

impl SyncTransport for ConfiguredTransport {
    async fn pull_full(&self, token: &str) -> TransportResult<ServerSnapshot> {
        self.http()?.pull_full(token).await
    }

    async fn pull_delta(&self, token: &str, since: i64) -> TransportResult<ServerSnapshot> {
        self.http()?.pull_delta(token, since).await
    }

    async fn push(&self, token: &str, request: &PushRequest) -> TransportResult<ServerSnapshot> {
        self.http()?.push(token, request).await
    }

    async fn delete_bookmark(&self, token: &str, url: &str) -> TransportResult<bool> {
        self.http()?.delete_bookmark(token, url).await
    }

    async fn clear_history(&self, token: &str) -> TransportResult<bool> {
        self.http()?.clear_history(token).await
    }
}

/// Open the state database, restore the saved store and wire the sync engine.
pub async fn open_session(db_path: &Path) -> Result<Orchestrator, CliError> {
    let config = SyncConfig::default().with_env_overrides()?;
    let token = env::var(ENV_ACCESS_TOKEN).ok();
    open_session_with(db_path, &config, token).await
}

pub async fn open_session_with(
    db_path: &Path,
    config: &SyncConfig,
    token: Option<String>,
) -> Result<Orchestrator, CliError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %db_path.display(), "Opening local state database");
    let db = Database::open(db_path).await?;
    let orchestrator = SyncOrchestrator::new(
        LocalStore::default(),
        ConfiguredTransport::from_config(config)?,
        StaticTokenProvider::new(token),
        LibSqlStateRepository::new(db),
        config,
    );
    if !orchestrator.restore().await? {
        debug!(key = orchestrator.state_key(), "No saved state yet; starting empty");
    }
    Ok(orchestrator)
}

/// Network commands need an API URL before they touch the store.
pub fn require_sync(orchestrator: &Orchestrator) -> Result<(), CliError> {
    if orchestrator.transport().is_configured() {
        Ok(())
    } else {
        Err(CliError::SyncNotConfigured)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path().ok_or(CliError::NoDataDir)
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("closet").join("closet.db"))
}

/// Turn a finished sync into a success message or a CLI error.
pub fn outcome_message(outcome: SyncOutcome) -> Result<String, CliError> {
    match outcome {
        SyncOutcome::Synced(report) => {
            let mut parts = Vec::new();
            if report.pushed > 0 {
                parts.push(format!("pushed {} change(s)", report.pushed));
            }
            match report.pull {
                Some(PullKind::Full) => parts.push("pulled full snapshot".to_string()),
                Some(PullKind::Delta) => parts.push("pulled changes".to_string()),
                None => {}
            }
            if parts.is_empty() {
                Ok("Sync completed".to_string())
            } else {
                Ok(format!("Sync completed: {}", parts.join(", ")))
            }
        }
        SyncOutcome::NothingToPush => Ok("Nothing to push".to_string()),
        SyncOutcome::AlreadyRunning => Err(CliError::AlreadyRunning),
        SyncOutcome::AuthRequired => Err(CliError::AuthRequired),
        SyncOutcome::RecoverableError(reason) => Err(CliError::SyncFailed(reason)),
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub db_path: String,
    pub sync_configured: bool,
    pub consent: ConsentStatus,
    pub bookmarks: usize,
    pub history: usize,
    pub collections: usize,
    pub cart_sessions: usize,
    pub tabs: usize,
    pub pending_changes: usize,
    pub pending_deletions: usize,
    pub buffered_events: usize,
    pub last_sync: Option<i64>,
    pub sync_error: Option<String>,
}

impl StatusReport {
    pub fn collect(store: &LocalStore, db_path: &Path, sync_configured: bool) -> Self {
        let outbox = store.pending_changes();
        let analytics = store.analytics_buffer();
        let metadata = store.sync_metadata();
        Self {
            db_path: db_path.display().to_string(),
            sync_configured,
            consent: store.consent(),
            bookmarks: store.bookmarks().len(),
            history: store.history().len(),
            collections: store.collections().len(),
            cart_sessions: store.cart_history().len(),
            tabs: store.tabs().len(),
            pending_changes: outbox.bookmarks.len()
                + outbox.history.len()
                + outbox.collections.len()
                + outbox.cart_history.len(),
            pending_deletions: outbox.deleted_bookmark_urls.len()
                + outbox.deleted_collection_ids.len(),
            buffered_events: analytics.product_interactions.len()
                + analytics.time_to_action.len(),
            last_sync: metadata.last_sync_timestamp,
            sync_error: metadata.sync_error.clone(),
        }
    }

    pub fn lines(&self, now_ms: i64) -> Vec<String> {
        let last_sync = self.last_sync.map_or_else(
            || "never".to_string(),
            |timestamp| {
                format!(
                    "{} ({})",
                    format_sync_timestamp(timestamp),
                    format_relative_time(timestamp, now_ms)
                )
            },
        );
        let mut lines = vec![
            format!("Database:     {}", self.db_path),
            format!("Consent:      {}", consent_label(self.consent)),
            format!("Bookmarks:    {}", self.bookmarks),
            format!("History:      {}", self.history),
            format!("Collections:  {}", self.collections),
            format!("Cart sessions: {}", self.cart_sessions),
            format!("Tabs:         {}", self.tabs),
            format!(
                "Pending:      {} change(s), {} deletion(s), {} event(s)",
                self.pending_changes, self.pending_deletions, self.buffered_events
            ),
            format!("Last sync:    {last_sync}"),
        ];
        if !self.sync_configured {
            lines.push("Sync:         not configured (set CLOSET_API_BASE_URL)".to_string());
        }
        if let Some(error) = &self.sync_error {
            lines.push(format!("Sync error:   {error}"));
        }
        lines
    }
}

pub const fn consent_label(status: ConsentStatus) -> &'static str {
    match status {
        ConsentStatus::Pending => "not asked",
        ConsentStatus::Accepted => "accepted",
        ConsentStatus::Declined => "declined",
    }
}

pub fn format_bookmark_lines(bookmarks: &[Bookmark]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    bookmarks
        .iter()
        .map(|bookmark| {
            let title = truncate(&bookmark.title, 40);
            let price = bookmark
                .price
                .map_or_else(String::new, |price| format!(" {price:.2}"));
            format!(
                "{title}{price} | {} | {}",
                bookmark.url,
                format_relative_time(bookmark.added_at, now_ms)
            )
        })
        .collect()
}

pub fn format_history_lines(entries: &[HistoryEntry]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} | {} | {}x | {}",
                truncate(&entry.title, 40),
                entry.url,
                entry.visit_count,
                format_relative_time(entry.visited_at, now_ms)
            )
        })
        .collect()
}

pub fn format_collection_lines(collections: &[Collection]) -> Vec<String> {
    collections
        .iter()
        .map(|collection| {
            let short_id = collection.id.chars().take(8).collect::<String>();
            format!(
                "{short_id} | {} | {} item(s)",
                truncate(&collection.name, 40),
                collection.items.len()
            )
        })
        .collect()
}

/// Collapse whitespace and cut to `max_chars`, marking the cut with "...".
pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
