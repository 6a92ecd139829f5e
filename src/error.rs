//! Error types and the retry classification for remote API failures.

use google_drive3 as drive3;
use serde_json::Value;
use thiserror::Error;

/// A failed call against the Drive or Sheets API, reduced to the three
/// outcomes the workflow distinguishes.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The API rejected the call for quota reasons. Retryable.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The addressed object no longer exists. Non-fatal for remediation,
    /// which treats it as "file already gone".
    #[error("not found: {0}")]
    NotFound(String),

    /// Everything else: auth failures, malformed requests, transport
    /// errors. Never retried.
    #[error("remote API call failed: {0}")]
    Api(String),
}

/// Whether a failure is worth retrying. Computed once per failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Retryable,
    Fatal,
}

impl RemoteError {
    pub fn outcome(&self) -> Outcome {
        match self {
            RemoteError::RateLimited(_) => Outcome::Retryable,
            RemoteError::NotFound(_) | RemoteError::Api(_) => Outcome::Fatal,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The retry budget ran out while the API kept rate limiting.
    #[error("retry budget exceeded after {attempts} attempts: {last}")]
    RetryBudgetExceeded { attempts: u32, last: RemoteError },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("credential error: {0}")]
    Credentials(String),
}

/// Maps a generated-client error onto [`RemoteError`].
///
/// Drive reports quota exhaustion both as HTTP 429 and as 403 with a
/// `rateLimitExceeded` / `userRateLimitExceeded` reason, so the reason
/// string of a structured error body is inspected as well. The Sheets
/// client re-exports the same error type from the shared API runtime,
/// so one mapping covers both hubs.
pub(crate) fn from_google(err: drive3::Error, what: &str) -> RemoteError {
    match &err {
        drive3::Error::BadRequest(details) => {
            let code = details
                .pointer("/error/code")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let reason = details
                .pointer("/error/errors/0/reason")
                .and_then(Value::as_str)
                .unwrap_or("");
            if code == 429
                || (code == 403
                    && matches!(reason, "rateLimitExceeded" | "userRateLimitExceeded"))
            {
                RemoteError::RateLimited(format!("{what}: {err}"))
            } else if code == 404 {
                RemoteError::NotFound(what.to_string())
            } else {
                RemoteError::Api(format!("{what}: {err}"))
            }
        }
        drive3::Error::Failure(response) => match response.status().as_u16() {
            429 => RemoteError::RateLimited(format!("{what}: {err}")),
            404 => RemoteError::NotFound(what.to_string()),
            _ => RemoteError::Api(format!("{what}: {err}")),
        },
        _ => RemoteError::Api(format!("{what}: {err}")),
    }
}
