//! Rate-limit retry policy.
//!
//! Wraps a whole agent invocation: a rate-limited attempt is restarted from
//! scratch after a fixed backoff, anything else fails immediately.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, ErrorClass, Result};

/// Retry policy configuration.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Fixed wait between rate-limited attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-rate-limit error,
    /// or the attempt budget is spent. The closure receives the 1-based
    /// attempt number.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match err.class() {
                ErrorClass::Other => return Err(err),
                ErrorClass::RateLimit if attempt == max_attempts => {
                    tracing::error!(attempts = max_attempts, error = %err, "Rate limit retries exhausted");
                    return Err(AgentError::RateLimitExhausted {
                        attempts: max_attempts,
                    });
                }
                ErrorClass::RateLimit => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        wait_secs = self.backoff.as_secs(),
                        error = %err,
                        "Rate limit hit, waiting before retry"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => return Err(AgentError::Cancelled),
                        () = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        Err(AgentError::RateLimitExhausted {
            attempts: max_attempts,
        })
    }
}
