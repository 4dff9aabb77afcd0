//! Retry decisions for one logical call.
//!
//! Two gates with deliberately different rules:
//!
//! - a non-2xx response is retried whenever budget is left, whatever its status;
//! - an error is retried only when budget is left *and* it looks like a
//!   connection failure (its message mentions "timeout" or "failed to connect").
//!   The message is [`WebClientError::message`], which leaves out the URL.
//!
//! Body read failures never reach these gates: once a response head has been
//! accepted, the call is final.

use tracing::debug;

use crate::error::WebClientError;

/// Message fragments, lower-case, that mark a connection-class failure.
const CONNECTION_FAILURE_MARKERS: &[&str] = &["timeout", "failed to connect"];

/// Whether to run another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again; `retries_left` is the budget after this retry is spent.
    Retry { retries_left: u32 },
    /// Finish the call with what we have.
    DoNotRetry { reason: &'static str },
}

impl RetryDecision {
    #[must_use]
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

/// Decision after a response head arrived with `status`.
#[must_use]
pub fn should_retry_status(status: u16, retries_left: u32) -> RetryDecision {
    if (200..300).contains(&status) {
        return RetryDecision::DoNotRetry {
            reason: "successful response",
        };
    }
    if retries_left == 0 {
        debug!(status, "non-success response with no retries left");
        return RetryDecision::DoNotRetry {
            reason: "retry budget exhausted",
        };
    }
    RetryDecision::Retry {
        retries_left: retries_left - 1,
    }
}

/// Decision after the engine failed to produce a response.
#[must_use]
pub fn should_retry_error(error: &WebClientError, retries_left: u32) -> RetryDecision {
    if retries_left == 0 {
        return RetryDecision::DoNotRetry {
            reason: "retry budget exhausted",
        };
    }
    if !is_connection_failure(error) {
        return RetryDecision::DoNotRetry {
            reason: "not a connection failure",
        };
    }
    RetryDecision::Retry {
        retries_left: retries_left - 1,
    }
}

/// Case-insensitive match of the URL-free error message against the
/// connection markers.
#[must_use]
pub fn is_connection_failure(error: &WebClientError) -> bool {
    let message = error.message().to_lowercase();
    CONNECTION_FAILURE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}
