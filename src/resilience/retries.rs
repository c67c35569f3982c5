//! Retry logic.
//!
//! # Responsibilities
//! - Re-run an operation while its error is classified as retryable
//! - Space attempts with exponential backoff + jitter
//! - Give up after `max_attempts` and hand back the last error

use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. `op` receives the 1-based attempt number.
pub async fn retry_if<T, E, F, Fut, P>(config: &RetryConfig, should_retry: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                tracing::debug!(attempt, delay = ?delay, "Retrying operation");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
