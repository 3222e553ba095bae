//! HTTP client for the Consul agent API

use crate::error::{DiagError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Connection establishment timeout for every request
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total timeout for status and self-description queries
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time allowed on top of the capture window for profile downloads
pub const FETCH_GRACE: Duration = Duration::from_secs(15);

const STATUS_PATH: &str = "/v1/status/leader";
const SELF_PATH: &str = "/v1/agent/self";

/// Retry budget applied by the client to each fetch
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Raw response from the agent
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl AgentResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Add a scheme to bare `host:port` addresses
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Client for a single Consul agent
pub struct AgentClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    retry: RetryPolicy,
}

impl AgentClient {
    /// Create a new agent client
    pub fn new(address: &str, token: Option<String>) -> Result<Self> {
        let normalized = normalize_address(address);
        let base_url =
            Url::parse(&normalized).map_err(|_| DiagError::InvalidAddress(address.to_string()))?;

        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the agent answers at all
    ///
    /// Single attempt so an unreachable target fails fast.
    pub async fn probe(&self) -> Result<()> {
        let unreachable = |reason: String| DiagError::Unreachable {
            address: self.base_url.to_string(),
            reason,
        };

        let response = self
            .send(STATUS_PATH, PROBE_TIMEOUT)
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if !response.is_success() {
            return Err(unreachable(format!(
                "status endpoint returned HTTP {}",
                response.status
            )));
        }

        Ok(())
    }

    /// Fetch the agent self-description as text
    pub async fn agent_self(&self) -> Result<String> {
        let response = self.fetch(SELF_PATH, PROBE_TIMEOUT).await?;
        debug!(status = response.status, "Fetched agent self-description");
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }

    /// GET `path`, retrying transport errors and transient statuses
    ///
    /// A response with an error status is still returned once the retry
    /// budget is spent, so callers can keep the body.
    pub async fn fetch(&self, path: &str, timeout: Duration) -> Result<AgentResponse> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = self.send(path, timeout).await;

            let retryable = match &result {
                Ok(response) => is_transient_status(response.status),
                Err(e) => !e.is_builder(),
            };

            if !retryable || attempt >= max_attempts {
                return result.map_err(DiagError::from);
            }

            debug!(
                path = %path,
                attempt = attempt,
                max_attempts = max_attempts,
                "Request failed, retrying"
            );
            tokio::time::sleep(self.retry.delay).await;
            attempt += 1;
        }
    }

    async fn send(
        &self,
        path: &str,
        timeout: Duration,
    ) -> std::result::Result<AgentResponse, reqwest::Error> {
        // Paths are static strings, so join only fails on a malformed base
        let url = self
            .base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone());

        let mut request = self.client.get(url).timeout(timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(AgentResponse { status, body })
    }
}

fn is_transient_status(status: u16) -> bool {
    match StatusCode::from_u16(status) {
        Ok(code) => {
            code.is_server_error()
                || code == StatusCode::REQUEST_TIMEOUT
                || code == StatusCode::TOO_MANY_REQUESTS
        }
        Err(_) => false,
    }
}

/// Read the agent's `EnableDebug` setting from its self-description
///
/// Returns `None` when the field is missing or the body is not parseable.
pub fn extract_debug_enabled(body: &str) -> Option<bool> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(found) = find_bool_key(&value, "EnableDebug") {
            return Some(found);
        }
    }

    let idx = body.find("\"EnableDebug\"")?;
    let rest = body[idx + "\"EnableDebug\"".len()..].trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    if rest.starts_with("true") {
        Some(true)
    } else if rest.starts_with("false") {
        Some(false)
    } else {
        None
    }
}

fn find_bool_key(value: &serde_json::Value, key: &str) -> Option<bool> {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(found) = map.get(key).and_then(|v| v.as_bool()) {
                return Some(found);
            }
            map.values().find_map(|v| find_bool_key(v, key))
        }
        serde_json::Value::Array(items) => items.iter().find_map(|v| find_bool_key(v, key)),
        _ => None,
    }
}
