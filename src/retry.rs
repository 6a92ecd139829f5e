//! Bounded exponential backoff for rate-limited writes.
//!
//! The sheet API enforces a per-minute write quota. Bulk appends keep the
//! call count low; this wrapper absorbs the bursts that still slip over.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AuditError, Outcome, RemoteError};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts made against a rate-limiting API before giving up.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1000,
        }
    }
}

/// Executes one remote write call, retrying only rate-limit failures.
///
/// Any other failure propagates immediately with zero retries. When every
/// attempt rate-limits, returns [`AuditError::RetryBudgetExceeded`] after
/// exactly `max_retries` attempts.
pub async fn write_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, AuditError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        match err.outcome() {
            Outcome::Fatal => return Err(AuditError::Remote(err)),
            Outcome::Retryable => {
                attempt += 1;
                if attempt >= policy.max_retries {
                    return Err(AuditError::RetryBudgetExceeded {
                        attempts: attempt,
                        last: err,
                    });
                }
                let delay = backoff_delay(policy, attempt - 1);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "rate limited, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// `initial_delay * 2^attempt` plus up to one second of uniform jitter,
/// with `attempt` the zero-based retry count.
fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = Duration::from_millis(policy.initial_delay_ms).as_secs_f64();
    let jitter: f64 = rand::random();
    Duration::from_secs_f64(base * 2f64.powi(attempt as i32) + jitter)
}
