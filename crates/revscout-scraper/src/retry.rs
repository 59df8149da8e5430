//! Retry with exponential backoff for transient fetch errors.
//!
//! Rate limiting (429) and network-level failures are worth retrying after a
//! delay. Everything else — a bot wall, a missing page, a bad status — would
//! return the same answer again, so it propagates immediately and the walker
//! decides what to do with the page.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`] — HTTP 429; the server has asked us to back off.
/// - [`ScraperError::Http`] — network-level failure (connection reset, timeout, etc.).
///
/// Non-retriable errors (propagated immediately):
/// - [`ScraperError::Blocked`] — an anti-bot wall does not clear on retry
///   from the same client.
/// - [`ScraperError::UnexpectedStatus`] — non-retriable HTTP status.
/// - [`ScraperError::SessionInit`] — construction-time failure; never seen here.
fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. } | ScraperError::Http(_)
    )
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for
/// `backoff_base_secs * 2^attempt` seconds and tries again, up to
/// `max_retries` additional attempts after the first try. If all retries are
/// exhausted the last error is returned. Non-retriable errors are returned
/// immediately without sleeping.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        // Exponential backoff: base * 2^attempt seconds, saturating on
        // extreme configs.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %last_err,
            "transient fetch error — retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
