// =============================================================================
// Retry Executor — bounded exponential backoff around every external call
// =============================================================================
//
// All four collaborator calls (quote fetch, decision request, trade
// placement, outcome check) go through the same policy instead of ad hoc
// retry loops at each call site.
//
// Behavior:
//   - Up to `max_attempts` tries, backoff starting at `base_delay` and
//     doubling after each failed attempt.
//   - RateLimited / Timeout / Other are retried; InvalidResponse and
//     Validation end the cycle immediately.
//   - One log line per failed attempt; level depends on the classification.
//
// Sleeps use tokio's clock, so tests run under `start_paused` without
// waiting in real time.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::errors::{CallFailure, FailureKind, RetryError};

/// Retry parameters, fixed per session from config.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Run `operation` until it succeeds, fails non-retryably, or the attempt
    /// budget is spent. `label` names the call in log output.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallFailure>>,
    {
        let mut backoff = self.base_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) if !failure.is_retryable() => {
                    error!(
                        call = label,
                        attempt,
                        kind = %failure.kind,
                        error = %failure.message,
                        "non-retryable failure — abandoning call"
                    );
                    return Err(RetryError::Invalid(failure));
                }
                Err(failure) => {
                    match failure.kind {
                        FailureKind::RateLimited => warn!(
                            call = label,
                            attempt,
                            max_attempts = self.max_attempts,
                            backoff_secs = backoff.as_secs_f64(),
                            "rate limit hit — backing off"
                        ),
                        _ => error!(
                            call = label,
                            attempt,
                            max_attempts = self.max_attempts,
                            kind = %failure.kind,
                            error = %failure.message,
                            "call attempt failed"
                        ),
                    }

                    if attempt >= self.max_attempts {
                        error!(
                            call = label,
                            attempts = attempt,
                            "all retry attempts exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: failure,
                        });
                    }

                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
}
