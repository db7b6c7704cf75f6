//! Sync configuration for client apps.
//!
//! Provides a `SyncConfig` struct used by mobile shells and the CLI to
//! discover the sync API endpoint and the engine's explicit limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Default bound for a single transport call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default cap for each analytics-class outbox partition.
pub const DEFAULT_OUTBOX_LIMIT: usize = 5_000;

const ENV_API_BASE_URL: &str = "CLOSET_API_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "CLOSET_SYNC_TIMEOUT_SECS";
const ENV_OUTBOX_LIMIT: &str = "CLOSET_OUTBOX_LIMIT";
const ENV_USER_ID: &str = "CLOSET_USER_ID";

/// Client-side sync configuration.
///
/// Holds public endpoints and limits only. Credentials never live here; the
/// bearer token comes from the platform's secure storage at request time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Base URL of the sync API (e.g. `https://api.example.com`).
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Upper bound for a single transport call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum entries kept per analytics-class outbox partition.
    #[serde(default = "default_outbox_limit")]
    pub outbox_limit: usize,
    /// Account whose state blob is loaded and saved.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            outbox_limit: DEFAULT_OUTBOX_LIMIT,
            user_id: None,
        }
    }
}

impl SyncConfig {
    /// Parse a JSON config payload and validate it.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid sync config JSON: {error}")))?;
        config.validated()
    }

    /// Build a config from `CLOSET_*` environment variables, layered over
    /// `self`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(url) = normalize_text_option(std::env::var(ENV_API_BASE_URL).ok()) {
            self.api_base_url = Some(url);
        }
        if let Some(raw) = normalize_text_option(std::env::var(ENV_TIMEOUT_SECS).ok()) {
            self.request_timeout_secs = raw.parse().map_err(|_| {
                Error::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))
            })?;
        }
        if let Some(raw) = normalize_text_option(std::env::var(ENV_OUTBOX_LIMIT).ok()) {
            self.outbox_limit = raw
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_OUTBOX_LIMIT} must be a number")))?;
        }
        if let Some(user_id) = normalize_text_option(std::env::var(ENV_USER_ID).ok()) {
            self.user_id = Some(user_id);
        }
        self.validated()
    }

    /// Normalize and validate every field.
    pub fn validated(mut self) -> Result<Self> {
        self.api_base_url = match normalize_text_option(self.api_base_url.take()) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err(Error::Config(
                    "api_base_url must include http:// or https://".to_string(),
                ))
            }
            None => None,
        };
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.outbox_limit == 0 {
            return Err(Error::Config(
                "outbox_limit must be greater than zero".to_string(),
            ));
        }
        self.user_id = normalize_text_option(self.user_id.take());
        Ok(self)
    }

    /// Timeout applied to each transport call.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Account key used for the persisted state blob.
    pub fn user_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or("local")
    }
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_outbox_limit() -> usize {
    DEFAULT_OUTBOX_LIMIT
}
