use std::io;

use closet_core::sync::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] closet_core::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not a valid http(s) URL: {0}")]
    InvalidUrl(String),
    #[error("Already saved: {0}")]
    BookmarkExists(String),
    #[error("No saved product for URL: {0}")]
    BookmarkNotFound(String),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("{0}")]
    AmbiguousCollectionId(String),
    #[error("Collection already contains {0}")]
    AlreadyInCollection(String),
    #[error("Collection name cannot be empty")]
    EmptyCollectionName,
    #[error("Price must be a non-negative number: {0}")]
    InvalidPrice(f64),
    #[error("Analytics consent has not been given. Run `closet consent accept` first.")]
    TrackingDisabled,
    #[error("Could not resolve a data directory; pass --db-path or set CLOSET_DB_PATH.")]
    NoDataDir,
    #[error("Sync is not configured. Set CLOSET_API_BASE_URL to enable `closet sync`.")]
    SyncNotConfigured,
    #[error("Not signed in. Set CLOSET_ACCESS_TOKEN to sync.")]
    AuthRequired,
    #[error("Another sync is already running")]
    AlreadyRunning,
    #[error("Sync failed: {0}")]
    SyncFailed(String),
}
