//! Shared HTTP plumbing: client construction and response classification

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use analyst_core::{AgentError, Result};

/// Longest slice of an error body carried into an error message
const MAX_ERROR_BODY: usize = 500;

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send a request and decode a successful JSON body.
///
/// Transport failures are `ProviderUnavailable`, non-success statuses are
/// classified by [`status_error`], undecodable bodies are `Parse`.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder, backend: &str) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AgentError::ProviderUnavailable(format!("{backend}: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AgentError::ProviderUnavailable(format!("{backend}: {e}")))?;

    if !status.is_success() {
        tracing::warn!(backend, status = %status, "Provider returned an error status");
        return Err(status_error(backend, status, &body));
    }

    tracing::debug!(backend, bytes = body.len(), "Provider response received");
    serde_json::from_str(&body).map_err(|e| AgentError::Parse(format!("{backend} response: {e}")))
}

pub(crate) fn status_error(backend: &str, status: StatusCode, body: &str) -> AgentError {
    let detail = format!("{backend} returned {status}: {}", error_detail(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        _ => AgentError::Provider(detail),
    }
}

/// Both backends wrap failures as `{"error": {"message": ...}}`
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect())
}

/// `{base}/{path}` with exactly one slash between them
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let body = r#"{"error": {"message": "invalid x-api-key", "type": "authentication_error"}}"#;
        let err = status_error("Anthropic", StatusCode::UNAUTHORIZED, body);
        assert!(matches!(&err, AgentError::Auth(msg) if msg.ends_with("invalid x-api-key")));

        assert!(matches!(
            status_error("OpenAI", StatusCode::TOO_MANY_REQUESTS, "slow down"),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            status_error("OpenAI", StatusCode::BAD_GATEWAY, ""),
            AgentError::Provider(_)
        ));
    }

    #[test]
    fn test_error_detail_truncates_raw_bodies() {
        let body = "x".repeat(2000);
        assert_eq!(error_detail(&body).len(), MAX_ERROR_BODY);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://api.openai.com/v1/", "/chat/completions"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(join_url("http://localhost:9000", "v1/messages"), "http://localhost:9000/v1/messages");
    }
}
