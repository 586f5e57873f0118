//! reqwest-backed [`RemoteDataClient`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use snapline_shared::constants::{DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_MS};
use snapline_shared::types::Method;

use crate::error::NetworkError;
use crate::remote::{RemoteDataClient, Response};

/// Connection settings for [`HttpRemote`].
#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Opaque bearer token owned by the authentication layer.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

/// HTTP client for the social backend.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(config: HttpRemoteConfig) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout
    } else if e.is_builder() {
        NetworkError::InvalidRequest(e.to_string())
    } else {
        NetworkError::Transport(e.to_string())
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend answers errors as `{"message": "..."}`; anything else is
/// passed through as raw text.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(msg)) = map.get("message") {
            return msg.clone();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RemoteDataClient for HttpRemote {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, NetworkError> {
        let url = self.url(path);
        debug!(%method, %url, "Sending backend request");

        let mut builder = self.client.request(to_reqwest(method), &url);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let resp = builder.send().await.map_err(transport_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = error_message(status, &text);
            warn!(%method, %url, status = status.as_u16(), %message, "Backend request failed");
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| NetworkError::Decode(e.to_string()))?
        };

        Ok(Response::new(status.as_u16(), body))
    }
}
