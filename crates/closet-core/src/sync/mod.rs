//! Sync orchestration: push the outbox, pull snapshots, merge.
//!
//! The store lock is never held across a network await, so the UI keeps
//! mutating while a sync is in flight. Every network operation is guarded
//! by a single-flight token and bounded by the configured request timeout.

pub mod protocol;
mod transport;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

pub use transport::{
    HttpSyncTransport, StaticTokenProvider, SyncTransport, TokenProvider, TransportError,
    TransportResult,
};

use crate::config::SyncConfig;
use crate::db::{state_key, StateRepository};
use crate::error::Result;
use crate::state::SyncPhase;
use crate::store::{LocalStore, StoreSnapshot};
use crate::util::normalize_text_option;

/// Which pull ran during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullKind {
    Full,
    Delta,
}

/// What a completed sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records carried by the push, zero when nothing was pushed
    pub pushed: usize,
    pub pull: Option<PullKind>,
    /// `serverTimestamp` of the last merged snapshot
    pub server_timestamp: Option<i64>,
}

/// Result of a sync operation. Failures are values, never panics or errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(SyncReport),
    NothingToPush,
    AlreadyRunning,
    AuthRequired,
    RecoverableError(String),
}

enum Failure {
    AuthRequired,
    Recoverable(String),
}

impl From<TransportError> for Failure {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unauthorized => Self::AuthRequired,
            other => Self::Recoverable(other.to_string()),
        }
    }
}

/// Clears the in-flight flag when the guarded operation ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives push/pull cycles for one [`LocalStore`].
pub struct SyncOrchestrator<T, P, R> {
    store: Arc<Mutex<LocalStore>>,
    transport: T,
    tokens: P,
    repository: R,
    state_key: String,
    request_timeout: Duration,
    in_flight: AtomicBool,
    persist_lock: Mutex<()>,
    phase: watch::Sender<SyncPhase>,
}

impl<T, P, R> SyncOrchestrator<T, P, R>
where
    T: SyncTransport,
    P: TokenProvider,
    R: StateRepository,
{
    pub fn new(store: LocalStore, transport: T, tokens: P, repository: R, config: &SyncConfig) -> Self {
        let store = store.with_outbox_limit(config.outbox_limit);
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store: Arc::new(Mutex::new(store)),
            transport,
            tokens,
            repository,
            state_key: state_key(config.user_key()),
            request_timeout: config.request_timeout(),
            in_flight: AtomicBool::new(false),
            persist_lock: Mutex::new(()),
            phase,
        }
    }

    /// Shared handle to the store for UI mutations.
    pub fn store(&self) -> Arc<Mutex<LocalStore>> {
        Arc::clone(&self.store)
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub const fn repository(&self) -> &R {
        &self.repository
    }

    pub fn state_key(&self) -> &str {
        &self.state_key
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Send the outbox and buffered analytics in one request.
    pub async fn push_changes(&self) -> SyncOutcome {
        let Some(_guard) = self.try_begin() else {
            return SyncOutcome::AlreadyRunning;
        };
        if !self.store.lock().await.has_pending_changes() {
            return SyncOutcome::NothingToPush;
        }
        let mut report = SyncReport::default();
        let result = self.push_step(&mut report).await.map(|()| report);
        self.finish(result).await
    }

    /// Pull the whole server snapshot.
    pub async fn full_sync(&self) -> SyncOutcome {
        self.pull_only(PullKind::Full).await
    }

    /// Pull changes since the last sync, or everything without a cursor.
    pub async fn delta_sync(&self) -> SyncOutcome {
        self.pull_only(PullKind::Delta).await
    }

    /// Push, then pull full or delta depending on local state.
    pub async fn sync(&self) -> SyncOutcome {
        let Some(_guard) = self.try_begin() else {
            return SyncOutcome::AlreadyRunning;
        };
        let result = self.run_sync().await;
        self.finish(result).await
    }

    /// Remove a bookmark locally, then tell the server if possible.
    ///
    /// A failed or skipped request leaves the tombstone for the next push.
    pub async fn delete_bookmark(&self, url: &str) -> bool {
        let url = url.trim();
        if !self.store.lock().await.remove_bookmark(url) {
            return false;
        }
        if let Some(token) = self.access_token() {
            match self.call(self.transport.delete_bookmark(&token, url)).await {
                Ok(true) => self.store.lock().await.acknowledge_bookmark_deletion(url),
                Ok(false) => debug!(url, "server declined bookmark delete"),
                Err(error) => debug!(url, %error, "bookmark delete deferred to next push"),
            }
        }
        self.persist_logged().await;
        true
    }

    /// Clear history locally, then ask the server to clear it too.
    /// Returns whether the server acknowledged.
    pub async fn clear_history(&self) -> bool {
        self.store.lock().await.clear_history();
        let mut acknowledged = false;
        if let Some(token) = self.access_token() {
            match self.call(self.transport.clear_history(&token)).await {
                Ok(ack) => acknowledged = ack,
                Err(error) => debug!(%error, "server history clear failed"),
            }
        }
        self.persist_logged().await;
        acknowledged
    }

    /// Save the store blob for the configured user. Overlapping calls are
    /// written in the order their snapshots were taken.
    pub async fn persist(&self) -> Result<()> {
        let _writer = self.persist_lock.lock().await;
        let blob = {
            let store = self.store.lock().await;
            serde_json::to_string(store.snapshot())?
        };
        self.repository.save(&self.state_key, &blob).await
    }

    /// Load the store blob for the configured user. Returns `false` when
    /// nothing was saved yet.
    pub async fn restore(&self) -> Result<bool> {
        let Some(blob) = self.repository.load(&self.state_key).await? else {
            return Ok(false);
        };
        let snapshot: StoreSnapshot = serde_json::from_str(&blob)?;
        self.store.lock().await.replace_snapshot(snapshot);
        debug!(key = %self.state_key, "restored local store");
        Ok(true)
    }

    async fn pull_only(&self, kind: PullKind) -> SyncOutcome {
        let Some(_guard) = self.try_begin() else {
            return SyncOutcome::AlreadyRunning;
        };
        let mut report = SyncReport::default();
        let result = self.pull_step(kind, &mut report).await.map(|()| report);
        self.finish(result).await
    }

    async fn run_sync(&self) -> std::result::Result<SyncReport, Failure> {
        let mut report = SyncReport::default();
        self.push_step(&mut report).await?;
        let kind = if self.store.lock().await.needs_full_sync() {
            PullKind::Full
        } else {
            PullKind::Delta
        };
        self.pull_step(kind, &mut report).await?;
        Ok(report)
    }

    async fn push_step(&self, report: &mut SyncReport) -> std::result::Result<(), Failure> {
        let request = self.store.lock().await.prepare_push();
        let Some(request) = request else {
            return Ok(());
        };
        self.enter(SyncPhase::Pushing).await;
        let token = self.access_token().ok_or(Failure::AuthRequired)?;

        info!(records = request.record_count(), "Pushing local changes");
        let snapshot = self.call(self.transport.push(&token, &request)).await?;

        let mut store = self.store.lock().await;
        store.acknowledge_push(&request);
        store.apply_server_sync(&snapshot);
        report.pushed = request.record_count();
        report.server_timestamp = Some(snapshot.server_timestamp);
        Ok(())
    }

    async fn pull_step(
        &self,
        kind: PullKind,
        report: &mut SyncReport,
    ) -> std::result::Result<(), Failure> {
        self.enter(SyncPhase::Pulling).await;
        let token = self.access_token().ok_or(Failure::AuthRequired)?;
        let since = self.store.lock().await.sync_metadata().last_sync_timestamp;

        let (kind, snapshot) = match (kind, since) {
            (PullKind::Delta, Some(since)) => {
                debug!(since, "Pulling delta");
                let snapshot = self.call(self.transport.pull_delta(&token, since)).await?;
                (PullKind::Delta, snapshot)
            }
            _ => {
                debug!("Pulling full snapshot");
                (PullKind::Full, self.call(self.transport.pull_full(&token)).await?)
            }
        };

        self.store.lock().await.apply_server_sync(&snapshot);
        report.pull = Some(kind);
        report.server_timestamp = Some(snapshot.server_timestamp);
        Ok(())
    }

    async fn finish(&self, result: std::result::Result<SyncReport, Failure>) -> SyncOutcome {
        let outcome = {
            let mut store = self.store.lock().await;
            match result {
                Ok(report) => {
                    store.finish_sync(None);
                    self.phase.send_replace(SyncPhase::Idle);
                    info!(
                        pushed = report.pushed,
                        pull = ?report.pull,
                        server_timestamp = ?report.server_timestamp,
                        "Sync complete"
                    );
                    SyncOutcome::Synced(report)
                }
                Err(Failure::AuthRequired) => {
                    store.finish_sync(None);
                    self.phase.send_replace(SyncPhase::Idle);
                    debug!("Sync skipped: sign-in required");
                    SyncOutcome::AuthRequired
                }
                Err(Failure::Recoverable(reason)) => {
                    warn!(error = %reason, "Sync failed; outbox kept for retry");
                    store.finish_sync(Some(reason.clone()));
                    self.phase.send_replace(SyncPhase::Error);
                    SyncOutcome::RecoverableError(reason)
                }
            }
        };
        self.persist_logged().await;
        outcome
    }

    async fn enter(&self, phase: SyncPhase) {
        self.store.lock().await.begin_sync();
        self.phase.send_replace(phase);
        debug!(?phase, "Sync phase");
    }

    fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    fn access_token(&self) -> Option<String> {
        normalize_text_option(self.tokens.access_token())
    }

    async fn call<F, V>(&self, request: F) -> TransportResult<V>
    where
        F: Future<Output = TransportResult<V>>,
    {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.request_timeout)),
        }
    }

    async fn persist_logged(&self) {
        if let Err(error) = self.persist().await {
            warn!(%error, "Failed to persist local store");
        }
    }
}
