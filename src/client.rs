//! HTTP executor with bounded retries and backoff.
//!
//! Every outbound call in the pipeline goes through [`HttpExecutor`]. Rate
//! limit responses back off exponentially, other transient failures back off
//! linearly, and exhaustion surfaces as a typed error the enricher treats as
//! a tolerable per-item failure.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Failure taxonomy for a single logical fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    #[error("failure envelope from server: {0}")]
    Envelope(String),

    #[error("unexpected payload shape: {0}")]
    DataShape(String),
}

/// Which backoff curve a failed attempt selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    RateLimited,
    Transient,
}

/// Retry knobs, injected per source.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base for the exponential curve used on rate limit responses.
    pub rate_limit_base: Duration,
    /// Base for the linear curve used on other transient failures.
    pub transient_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(1),
            transient_base: Duration::from_millis(500),
        }
    }
}

/// Delay before retrying attempt number `attempt` (zero-based).
///
/// Rate limits double: `base * 2^attempt`. Everything else grows linearly:
/// `base * (attempt + 1)`.
pub fn backoff_delay(failure: AttemptFailure, attempt: u32, policy: &RetryPolicy) -> Duration {
    match failure {
        AttemptFailure::RateLimited => policy.rate_limit_base * 2u32.saturating_pow(attempt),
        AttemptFailure::Transient => policy.transient_base * (attempt + 1),
    }
}

/// Thin wrapper around [`reqwest::Client`] that applies the retry policy to
/// every GET.
pub struct HttpExecutor {
    client: Client,
    policy: RetryPolicy,
}

impl HttpExecutor {
    /// Build an executor with a per-attempt timeout and a fixed set of
    /// default headers (venue auth lives here).
    pub fn new(
        timeout: Duration,
        policy: RetryPolicy,
        headers: &[(&str, &str)],
    ) -> Result<Self> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            header_map.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(header_map)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, policy })
    }

    /// GET `url` and parse the body as JSON, retrying per the policy.
    ///
    /// A non-JSON success body is a [`FetchError::DataShape`] and is not
    /// retried; the payload will not get better on a second read.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let mut last_error = FetchError::Transport("no attempts made".to_string());

        for attempt in 0..self.policy.max_attempts {
            let failure = match self.client.get(url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        warn!(url, attempt, "rate limited, backing off");
                        last_error = FetchError::RateLimited {
                            attempts: attempt + 1,
                        };
                        AttemptFailure::RateLimited
                    } else if !status.is_success() {
                        debug!(url, status = status.as_u16(), attempt, "server error");
                        last_error = FetchError::Server {
                            status: status.as_u16(),
                        };
                        AttemptFailure::Transient
                    } else {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| FetchError::DataShape(e.to_string()));
                    }
                }
                Err(e) => {
                    debug!(url, attempt, error = %e, "transport error");
                    last_error = FetchError::Transport(e.to_string());
                    AttemptFailure::Transient
                }
            };

            if attempt + 1 < self.policy.max_attempts {
                sleep(backoff_delay(failure, attempt, &self.policy)).await;
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            rate_limit_base: Duration::from_millis(100),
            transient_base: Duration::from_millis(50),
        };

        assert_eq!(
            backoff_delay(AttemptFailure::RateLimited, 0, &policy),
            Duration::from_millis(100)
        );
        assert_eq!(
            backoff_delay(AttemptFailure::RateLimited, 1, &policy),
            Duration::from_millis(200)
        );
        assert_eq!(
            backoff_delay(AttemptFailure::RateLimited, 2, &policy),
            Duration::from_millis(400)
        );
    }

    #[test]
    fn transient_backoff_grows_linearly() {
        let policy = RetryPolicy {
            max_attempts: 4,
            rate_limit_base: Duration::from_millis(100),
            transient_base: Duration::from_millis(50),
        };

        assert_eq!(
            backoff_delay(AttemptFailure::Transient, 0, &policy),
            Duration::from_millis(50)
        );
        assert_eq!(
            backoff_delay(AttemptFailure::Transient, 1, &policy),
            Duration::from_millis(100)
        );
        assert_eq!(
            backoff_delay(AttemptFailure::Transient, 2, &policy),
            Duration::from_millis(150)
        );
    }
}
