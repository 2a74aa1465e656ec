//! reqwest-backed implementation of [`RemoteApi`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::payload::{SessionCompletion, SetLog, WeightLog};

use super::{RemoteApi, RemoteError, RemoteResult};

/// Supplies the bearer token for authenticated calls.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, typically read from configuration.
#[derive(Debug, Clone)]
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// JSON-over-HTTP client for the workout service write endpoints.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpRemote {
    /// Creates a client for `base_url`.
    ///
    /// `timeout` bounds the whole request; hitting it is a transport failure.
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> RemoteResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = self.tokens.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = if message.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                message
            };
            tracing::debug!(%url, status = status.as_u16(), "write rejected");
            return Err(RemoteError::rejected(Some(status.as_u16()), message));
        }

        // A 2xx means the write is committed; body trouble must not make it retryable.
        Ok(read_accepted_body(&url, response).await)
    }
}

/// Best-effort decode of an accepted response: JSON if possible, raw text
/// otherwise, `Null` when the body is empty or cut short.
async fn read_accepted_body(url: &str, response: reqwest::Response) -> Value {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(%url, error = %err, "accepted write returned an unreadable body");
            return Value::Null;
        }
    };
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        tracing::warn!(%url, error = %err, "accepted write returned a non-JSON body");
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    })
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn log_set(&self, set: &SetLog) -> RemoteResult<Value> {
        self.post("/api/sets", set).await
    }

    async fn complete_session(&self, completion: &SessionCompletion) -> RemoteResult<Value> {
        let path = format!(
            "/api/sessions/{}/complete",
            urlencoding::encode(&completion.session_id)
        );
        self.post(&path, completion).await
    }

    async fn log_weight(&self, entry: &WeightLog) -> RemoteResult<Value> {
        self.post("/api/weight-logs", entry).await
    }
}

/// Maps a reqwest failure onto the transport/rejection split.
///
/// Only errors that carry a response status count as rejections.
pub fn classify(err: reqwest::Error) -> RemoteError {
    match err.status() {
        Some(status) => RemoteError::rejected(Some(status.as_u16()), err.to_string()),
        None => RemoteError::Transport(err.to_string()),
    }
}

/// Returns true when `url` answers at all, whatever the status.
pub async fn check_server(client: &reqwest::Client, url: &str) -> bool {
    client.get(url).send().await.is_ok()
}
