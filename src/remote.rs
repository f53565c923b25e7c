//! Shared HTTP plumbing for the remote embedding and LLM gateways.
//!
//! # Retry Strategy
//!
//! - HTTP 401/403 → [`Error::Auth`], no retry
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - Other HTTP 4xx → [`Error::Remote`], no retry
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use docqa_core::{Error, Result};
use reqwest::StatusCode;
use serde_json::Value;

/// What to do with a non-success HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusAction {
    Auth,
    Retry,
    Fail,
}

pub(crate) fn classify_status(status: StatusCode) -> StatusAction {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StatusAction::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else {
        StatusAction::Fail
    }
}

/// Delay before retry `attempt` (1-based).
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Remote(format!("failed to build HTTP client: {}", e)))
}

/// A JSON POST with the retry policy above.
pub(crate) struct JsonPost<'a> {
    pub client: &'a reqwest::Client,
    /// Label used in error messages (e.g. `"Gemini"`).
    pub service: &'a str,
    pub url: String,
    pub bearer: Option<&'a str>,
    pub headers: Vec<(&'static str, String)>,
    pub max_retries: u32,
}

impl JsonPost<'_> {
    pub async fn send(&self, body: &Value) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let mut request = self.client.post(&self.url).json(body);
            if let Some(token) = self.bearer {
                request = request.bearer_auth(token);
            }
            for (name, value) in &self.headers {
                request = request.header(*name, value);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(service = self.service, attempt, error = %e, "request failed");
                    last_err = Some(Error::Remote(format!("{} request failed: {}", self.service, e)));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.json::<Value>().await.map_err(|e| {
                    Error::Remote(format!("{} returned invalid JSON: {}", self.service, e))
                });
            }

            let body_text = response.text().await.unwrap_or_default();
            match classify_status(status) {
                StatusAction::Auth => {
                    return Err(Error::Auth(format!(
                        "{} rejected the credentials ({}): {}",
                        self.service, status, body_text
                    )))
                }
                StatusAction::Fail => {
                    return Err(Error::Remote(format!(
                        "{} API error {}: {}",
                        self.service, status, body_text
                    )))
                }
                StatusAction::Retry => {
                    tracing::warn!(service = self.service, attempt, %status, "retryable API error");
                    last_err = Some(Error::Remote(format!(
                        "{} API error {}: {}",
                        self.service, status, body_text
                    )));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::Remote(format!("{} call failed after retries", self.service))
        }))
    }
}

/// Read a required API key from the environment, failing with `Auth`.
pub(crate) fn require_env_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Auth(format!("{} environment variable not set", var))),
    }
}

/// Convert a JSON array of numbers into an `f32` vector.
pub(crate) fn json_to_vec(value: &Value, service: &str) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| Error::Remote(format!("Invalid {} response: embedding is not an array", service)))?;
    Ok(arr.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
}
