//! Exponential backoff for remote calls.

use crate::Result;
use std::future::Future;
use std::time::Duration;

/// Delay before retry number `attempt + 1`: 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

/// Run `call` until it succeeds, fails permanently, or `max_retries` retries
/// have been spent. `call` receives the zero-based attempt number.
///
/// The error of the last attempt is returned on exhaustion.
pub async fn with_backoff<T, F, Fut>(max_retries: u32, mut call: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
