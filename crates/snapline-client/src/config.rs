//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration against the public backend.

use std::str::FromStr;
use std::time::Duration;

use snapline_net::HttpRemoteConfig;
use snapline_shared::constants::{
    DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STORY_DURATION_MS,
};
use snapline_store::BookmarkSync;

/// What happens to an optimistic mutation whose confirmation failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Undo the local mutation and notify the presentation layer.
    #[default]
    Rollback,
    /// Keep the local mutation; the failure is only logged and announced.
    KeepOptimistic,
}

impl FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rollback" | "revert" => Ok(Self::Rollback),
            "keep" | "keep_optimistic" | "keep-optimistic" => Ok(Self::KeepOptimistic),
            other => Err(format!("unknown reconcile policy: {other}")),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Social backend base URL.
    /// Env: `SNAPLINE_API_URL`
    pub api_url: String,

    /// Bearer token issued by the authentication backend.
    /// Env: `SNAPLINE_API_TOKEN`
    /// Default: none (anonymous requests).
    pub api_token: Option<String>,

    /// Per-request timeout.
    /// Env: `SNAPLINE_REQUEST_TIMEOUT_MS`
    /// Default: 10 s.
    pub request_timeout: Duration,

    /// Env: `SNAPLINE_RECONCILE_POLICY` (`rollback` / `keep`)
    /// Default: `rollback`
    pub reconcile_policy: ReconcilePolicy,

    /// Env: `SNAPLINE_BOOKMARK_SYNC` (`local` / `remote`)
    /// Default: `local`
    pub bookmark_sync: BookmarkSync,

    /// Story duration used when the backend does not provide one.
    /// Env: `SNAPLINE_STORY_DURATION_MS`
    /// Default: 5000.
    pub story_duration_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            reconcile_policy: ReconcilePolicy::default(),
            bookmark_sync: BookmarkSync::default(),
            story_duration_ms: DEFAULT_STORY_DURATION_MS,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("SNAPLINE_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_string();
            }
        }

        if let Some(token) = lookup("SNAPLINE_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Some(val) = lookup("SNAPLINE_REQUEST_TIMEOUT_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.request_timeout = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid SNAPLINE_REQUEST_TIMEOUT_MS, using default"),
            }
        }

        if let Some(val) = lookup("SNAPLINE_RECONCILE_POLICY") {
            match val.parse() {
                Ok(policy) => config.reconcile_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid SNAPLINE_RECONCILE_POLICY, using default"),
            }
        }

        if let Some(val) = lookup("SNAPLINE_BOOKMARK_SYNC") {
            match val.parse() {
                Ok(sync) => config.bookmark_sync = sync,
                Err(e) => tracing::warn!(error = %e, "Invalid SNAPLINE_BOOKMARK_SYNC, using default"),
            }
        }

        if let Some(val) = lookup("SNAPLINE_STORY_DURATION_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.story_duration_ms = ms,
                _ => tracing::warn!(value = %val, "Invalid SNAPLINE_STORY_DURATION_MS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn http(&self) -> HttpRemoteConfig {
        HttpRemoteConfig {
            base_url: self.api_url.clone(),
            token: self.api_token.clone(),
            timeout: self.request_timeout,
        }
    }
}
