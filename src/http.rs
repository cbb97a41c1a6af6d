//! Shared HTTP plumbing for the embedding and generation providers.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use thiserror::Error;

/// Failure talking to a model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub(crate) fn invalid(provider: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { .. } => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::InvalidResponse { .. } => false,
        }
    }
}

/// Build a client with the configured request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Delay before retry number `attempt` (1-based).
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

/// Send a JSON request, retrying transient failures, and return the parsed
/// JSON body of the first successful response.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`.
pub(crate) async fn send_json_with_retry<F>(
    provider: &'static str,
    max_retries: u32,
    build: F,
) -> Result<serde_json::Value, ProviderError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::warn!(
                provider,
                attempt,
                delay_secs = delay.as_secs(),
                error = %last_err.as_ref().map(ToString::to_string).unwrap_or_default(),
                "retrying provider request"
            );
            tokio::time::sleep(delay).await;
        }

        let err = match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|e| ProviderError::invalid(provider, e.to_string()));
                }
                let body = response.text().await.unwrap_or_default();
                ProviderError::Api {
                    provider,
                    status: status.as_u16(),
                    body,
                }
            }
            Err(source) => ProviderError::Http { provider, source },
        };

        if !err.is_retryable() {
            return Err(err);
        }
        last_err = Some(err);
    }

    Err(last_err.unwrap_or_else(|| {
        ProviderError::invalid(provider, "request failed after retries")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let secs: Vec<u64> = (1..=8).map(|a| backoff_delay(a).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 32, 32]);
    }

    #[test]
    fn test_retryable_classification() {
        let api = |status| ProviderError::Api {
            provider: "test",
            status,
            body: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!ProviderError::invalid("test", "bad").is_retryable());
    }
}
