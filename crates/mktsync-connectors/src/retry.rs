//! Retry with exponential back-off and jitter for vendor API calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 429, 5xx). Envelope-level API errors
//! and malformed bodies are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ConnectorError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - [`ConnectorError::RateLimited`]: HTTP 429.
/// - HTTP 5xx responses, whether surfaced by `reqwest` or as
///   [`ConnectorError::UnexpectedStatus`].
///
/// Everything else is a hard stop.
pub(crate) fn is_retriable(err: &ConnectorError) -> bool {
    match err {
        ConnectorError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ConnectorError::RateLimited { .. } => true,
        ConnectorError::UnexpectedStatus { status, .. } => *status >= 500,
        ConnectorError::Deserialize { .. }
        | ConnectorError::Api { .. }
        | ConnectorError::MissingCredential { .. }
        | ConnectorError::InvalidBaseUrl { .. }
        | ConnectorError::InvalidRequest(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Attempt | Sleep before next attempt        |
/// |---------|----------------------------------|
/// | 1       | 1 000 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 1 000 ms × 2¹ ± 25 % jitter     |
/// | 3       | 1 000 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 60 s, except that a 429 never waits less than the
/// vendor's `Retry-After`. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ConnectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConnectorError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let delay_ms = match &err {
                    ConnectorError::RateLimited { retry_after_secs, .. } => {
                        jittered.max(retry_after_secs.saturating_mul(1_000))
                    }
                    _ => jittered,
                };
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient vendor API error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
