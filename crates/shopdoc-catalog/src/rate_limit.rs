//! Retry with exponential back-off and jitter for catalog requests.
//!
//! Transient failures (HTTP 429, GraphQL `THROTTLED`, 5xx, network timeouts)
//! are retried. Anything that describes the request or the response shape is
//! returned immediately: retrying would produce the same answer.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;

/// Upper bound on a single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`CatalogError::RateLimited`] / [`CatalogError::Throttled`]: the API asked us to slow down.
/// - [`CatalogError::Http`]: timeouts, connection failures, 5xx.
/// - [`CatalogError::UnexpectedStatus`] with a 5xx status.
///
/// Everything else is a hard stop.
pub(crate) fn is_retriable(err: &CatalogError) -> bool {
    match err {
        CatalogError::RateLimited { .. } | CatalogError::Throttled(_) => true,
        CatalogError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        CatalogError::UnexpectedStatus { status, .. } => *status >= 500,
        CatalogError::Deserialize { .. }
        | CatalogError::SourceUnavailable(_)
        | CatalogError::BrokenCursor { .. }
        | CatalogError::PaginationLimit { .. }
        | CatalogError::BulkRejected(_)
        | CatalogError::JobFailed { .. }
        | CatalogError::JobTimedOut { .. }
        | CatalogError::InvalidEndpoint { .. } => false,
    }
}

/// Back-off before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at [`MAX_DELAY_MS`], then scaled by a random factor in `[0.75, 1.25)`.
///
/// A `RateLimited` error's `Retry-After` hint acts as a floor.
fn backoff_delay(attempt: u32, backoff_base_ms: u64, err: &CatalogError) -> Duration {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let floor = match err {
        CatalogError::RateLimited { retry_after_secs } => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    Duration::from_millis(jittered.max(floor.min(MAX_DELAY_MS)))
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// With `max_retries = 3` the operation is attempted at most 4 times.
/// Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = backoff_delay(attempt, backoff_base_ms, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient catalog error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn throttled() -> CatalogError {
        CatalogError::Throttled("Throttled".to_owned())
    }

    #[test]
    fn throttled_and_rate_limited_are_retriable() {
        assert!(is_retriable(&throttled()));
        assert!(is_retriable(&CatalogError::RateLimited {
            retry_after_secs: 0
        }));
    }

    #[test]
    fn server_errors_are_retriable_client_errors_are_not() {
        assert!(is_retriable(&CatalogError::UnexpectedStatus {
            status: 503,
            url: "https://x".to_owned()
        }));
        assert!(!is_retriable(&CatalogError::UnexpectedStatus {
            status: 401,
            url: "https://x".to_owned()
        }));
    }

    #[test]
    fn source_unavailable_is_not_retriable() {
        assert!(!is_retriable(&CatalogError::SourceUnavailable(
            "Field 'produts' doesn't exist".to_owned()
        )));
    }

    #[test]
    fn backoff_respects_retry_after_floor() {
        let err = CatalogError::RateLimited {
            retry_after_secs: 2,
        };
        assert!(backoff_delay(1, 0, &err) >= Duration::from_secs(2));
    }

    #[test]
    fn backoff_is_capped() {
        assert!(backoff_delay(30, 1_000_000, &throttled()) <= Duration::from_millis(75_000));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, CatalogError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_throttled_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(throttled())
                } else {
                    Ok::<u32, CatalogError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CatalogError>(throttled())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(CatalogError::Throttled(_))));
    }

    #[tokio::test]
    async fn does_not_retry_source_unavailable() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CatalogError>(CatalogError::SourceUnavailable("bad".to_owned()))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CatalogError::SourceUnavailable(_))));
    }
}
