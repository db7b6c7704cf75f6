//! HTTP boundary of the sync engine.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::protocol::{DeleteBookmarkRequest, PushRequest, ServerSnapshot};
use crate::config::SyncConfig;
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Sign-in required")]
    Unauthorized,
    #[error("Sync request failed: {0}")]
    Network(String),
    #[error("Sync API error: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid sync response: {0}")]
    Decode(String),
    #[error("Sync request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Server operations the orchestrator needs. Every call carries the bearer
/// token fetched for that attempt.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    /// `GET /browser-sync`
    async fn pull_full(&self, token: &str) -> TransportResult<ServerSnapshot>;

    /// `GET /browser-sync/delta?since=<ts>`
    async fn pull_delta(&self, token: &str, since: i64) -> TransportResult<ServerSnapshot>;

    /// `POST /browser-sync`
    async fn push(&self, token: &str, request: &PushRequest) -> TransportResult<ServerSnapshot>;

    /// `DELETE /browser-sync/bookmark`
    async fn delete_bookmark(&self, token: &str, url: &str) -> TransportResult<bool>;

    /// `DELETE /browser-sync/history`
    async fn clear_history(&self, token: &str) -> TransportResult<bool>;
}

/// Supplies the bearer token for sync calls.
pub trait TokenProvider {
    /// Current access token, or `None` when the user is signed out.
    fn access_token(&self) -> Option<String>;
}

/// Fixed token, e.g. from the environment.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: normalize_text_option(token),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// `reqwest`-backed transport for the `/browser-sync` API.
#[derive(Clone)]
pub struct HttpSyncTransport {
    base_url: String,
    client: Client,
}

impl HttpSyncTransport {
    pub fn new(base_url: impl Into<String>) -> TransportResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = Client::builder()
            .build()
            .map_err(|error| TransportError::InvalidConfiguration(error.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &SyncConfig) -> TransportResult<Self> {
        let base_url = config.api_base_url.clone().ok_or_else(|| {
            TransportError::InvalidConfiguration("api_base_url is not set".to_string())
        })?;
        Self::new(base_url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/browser-sync{path}", self.base_url)
    }
}

impl SyncTransport for HttpSyncTransport {
    async fn pull_full(&self, token: &str) -> TransportResult<ServerSnapshot> {
        let request = authorized(self.client.get(self.endpoint("")), token);
        send_json(request).await
    }

    async fn pull_delta(&self, token: &str, since: i64) -> TransportResult<ServerSnapshot> {
        let request = self
            .client
            .get(self.endpoint("/delta"))
            .query(&[("since", since)]);
        send_json(authorized(request, token)).await
    }

    async fn push(&self, token: &str, request: &PushRequest) -> TransportResult<ServerSnapshot> {
        let request = self.client.post(self.endpoint("")).json(request);
        send_json(authorized(request, token)).await
    }

    async fn delete_bookmark(&self, token: &str, url: &str) -> TransportResult<bool> {
        let body = DeleteBookmarkRequest {
            url: url.to_string(),
        };
        let request = self.client.delete(self.endpoint("/bookmark")).json(&body);
        send_ack(authorized(request, token)).await
    }

    async fn clear_history(&self, token: &str) -> TransportResult<bool> {
        let request = self.client.delete(self.endpoint("/history"));
        send_ack(authorized(request, token)).await
    }
}

fn authorized(request: RequestBuilder, token: &str) -> RequestBuilder {
    request
        .bearer_auth(token)
        .header("Accept", "application/json")
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> TransportResult<T> {
    let body = send(request).await?;
    serde_json::from_str(&body).map_err(|error| TransportError::Decode(error.to_string()))
}

/// Acknowledged unless the body explicitly says otherwise.
async fn send_ack(request: RequestBuilder) -> TransportResult<bool> {
    let body = send(request).await?;
    if body.trim().is_empty() {
        return Ok(true);
    }
    serde_json::from_str::<Acknowledgement>(&body)
        .map(|ack| ack.accepted())
        .map_err(|error| TransportError::Decode(error.to_string()))
}

async fn send(request: RequestBuilder) -> TransportResult<String> {
    let response = request.send().await?;
    let status = response.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(TransportError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        });
    }
    Ok(response.text().await?)
}

/// Boolean acknowledgement, either bare or wrapped as `{"success": bool}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Acknowledgement {
    Bare(bool),
    Wrapped { success: bool },
}

impl Acknowledgement {
    const fn accepted(&self) -> bool {
        match self {
            Self::Bare(value) | Self::Wrapped { success: value } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> TransportResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        TransportError::InvalidConfiguration("base url must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(TransportError::InvalidConfiguration(
            "base url must include http:// or https://".to_string(),
        ))
    }
}
