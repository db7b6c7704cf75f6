//! closet-core - Core library for Closet
//!
//! This crate contains the models, local store, merge rules, persistence and
//! sync orchestration shared by every Closet client. The store works fully
//! offline; the sync layer reconciles it with the `/browser-sync` API.

pub mod config;
pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use state::SyncPhase;
pub use store::{LocalStore, StoreSnapshot};
pub use sync::{SyncOrchestrator, SyncOutcome, SyncReport};
