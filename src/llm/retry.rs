//! Timeout and bounded-retry wrapper around generation calls.
//!
//! Every generation call in the routing core goes through
//! [`generate_with_retry`]: each attempt carries an independent timeout,
//! transient failures are retried with exponential backoff up to a fixed
//! bound, and permanent failures abort immediately.

use std::time::Duration;

use tracing::{debug, warn};

use super::message::{ChatRequest, ChatResponse};
use super::provider::GenerationProvider;
use crate::error::GenerationError;

/// Runs a generation call with per-attempt timeout and bounded retries.
///
/// Transient errors (timeout, transient transport failure) are retried up
/// to `max_retries` additional times with exponential backoff starting at
/// `backoff`. Permanent errors abort on first sight. Retry exhaustion maps
/// to [`GenerationError::RetriesExhausted`].
///
/// # Errors
///
/// Returns [`GenerationError::InvalidRequest`] unchanged on permanent
/// failures and [`GenerationError::RetriesExhausted`] when every attempt
/// failed transiently.
pub async fn generate_with_retry(
    provider: &dyn GenerationProvider,
    request: &ChatRequest,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
) -> Result<ChatResponse, GenerationError> {
    let attempts = max_retries.saturating_add(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if attempt > 0 {
            // Exponential backoff: backoff * 2^(attempt-1)
            let delay = backoff.saturating_mul(1 << (attempt - 1).min(16));
            debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying generation");
            tokio::time::sleep(delay).await;
        }

        let result = tokio::time::timeout(timeout, provider.generate(request)).await;
        let error = match result {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(e)) if e.is_transient() => e,
            Ok(Err(e)) => return Err(e),
            Err(_) => GenerationError::Timeout {
                timeout_secs: timeout.as_secs(),
            },
        };

        warn!(attempt, provider = provider.name(), %error, "transient generation failure");
        last_error = error.to_string();
    }

    Err(GenerationError::RetriesExhausted {
        attempts,
        message: last_error,
    })
}
