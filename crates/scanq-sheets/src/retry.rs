//! Backoff policy for sheet fetches.
//!
//! Transient conditions (network failures, 429, 5xx) are retried; everything
//! else, including access errors and undecodable bodies, is returned at once.
//! A 429 carrying `Retry-After` waits that long instead of the computed delay.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::SheetsError;

const MAX_DELAY: Duration = Duration::from_secs(30);
const JITTER: std::ops::RangeInclusive<f64> = 0.75..=1.25;

pub(crate) fn is_retriable(err: &SheetsError) -> bool {
    match err {
        SheetsError::Http(_) | SheetsError::RateLimited { .. } => true,
        SheetsError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        SheetsError::InvalidSpreadsheetUrl { .. }
        | SheetsError::NotFound { .. }
        | SheetsError::AccessDenied { .. }
        | SheetsError::Csv { .. }
        | SheetsError::Deserialize { .. } => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(backoff_base_ms),
        }
    }

    /// Wait before retry number `retry` (1-based) after `err`, scaled by
    /// `jitter`. Never exceeds 30 s.
    fn delay(&self, retry: u32, err: &SheetsError, jitter: f64) -> Duration {
        if let SheetsError::RateLimited { retry_after_secs } = err {
            if *retry_after_secs > 0 {
                return Duration::from_secs(*retry_after_secs).min(MAX_DELAY);
            }
        }
        let exponent = retry.saturating_sub(1).min(10);
        self.base
            .saturating_mul(1 << exponent)
            .min(MAX_DELAY)
            .mul_f64(jitter)
            .min(MAX_DELAY)
    }

    /// Runs `operation` once, then up to `max_retries` more times while it
    /// fails with a retriable error.
    pub(crate) async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, SheetsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SheetsError>>,
    {
        let mut retry = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry >= self.max_retries || !is_retriable(&err) {
                return Err(err);
            }
            retry += 1;

            let wait = self.delay(retry, &err, rand::rng().random_range(JITTER));
            tracing::warn!(
                retry,
                max_retries = self.max_retries,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient sheet fetch error, backing off"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn not_found() -> SheetsError {
        SheetsError::NotFound {
            url: "https://docs.google.com/spreadsheets/d/x/gviz/tq".to_owned(),
        }
    }

    fn server_error() -> SheetsError {
        SheetsError::UnexpectedStatus {
            status: 503,
            url: String::new(),
        }
    }

    #[test]
    fn classifies_transient_errors() {
        assert!(is_retriable(&server_error()));
        assert!(is_retriable(&SheetsError::RateLimited {
            retry_after_secs: 1
        }));
        assert!(!is_retriable(&SheetsError::UnexpectedStatus {
            status: 400,
            url: String::new()
        }));
        assert!(!is_retriable(&not_found()));
        assert!(!is_retriable(&SheetsError::AccessDenied {
            url: String::new(),
            reason: "private".to_owned()
        }));
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        assert!(!is_retriable(&SheetsError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }));
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 500);
        assert_eq!(policy.delay(1, &server_error(), 1.0), Duration::from_millis(500));
        assert_eq!(policy.delay(3, &server_error(), 1.0), Duration::from_secs(2));
        assert_eq!(policy.delay(12, &server_error(), 1.25), MAX_DELAY);
        assert_eq!(policy.delay(1, &server_error(), 0.75), Duration::from_millis(375));
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let policy = RetryPolicy::new(5, 500);
        let limited = SheetsError::RateLimited {
            retry_after_secs: 7,
        };
        assert_eq!(policy.delay(1, &limited, 1.25), Duration::from_secs(7));
        let huge = SheetsError::RateLimited {
            retry_after_secs: 3600,
        };
        assert_eq!(policy.delay(1, &huge, 1.0), MAX_DELAY);
    }

    async fn count_calls<T>(
        policy: RetryPolicy,
        outcome: impl Fn(u32) -> Result<T, SheetsError>,
    ) -> (Result<T, SheetsError>, u32) {
        let calls = AtomicU32::new(0);
        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let out = outcome(n);
                async move { out }
            })
            .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn first_success_is_returned() {
        let (result, calls) = count_calls(RetryPolicy::new(3, 0), |_| Ok(42)).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let (result, calls) = count_calls(RetryPolicy::new(3, 0), |n| {
            if n < 2 {
                Err(server_error())
            } else {
                Ok(99)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn zero_retries_runs_once() {
        let (result, calls) =
            count_calls(RetryPolicy::new(0, 0), |_| Err::<u32, _>(server_error())).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(SheetsError::UnexpectedStatus { .. })));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (_, calls) =
            count_calls(RetryPolicy::new(2, 0), |_| Err::<u32, _>(server_error())).await;
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (result, calls) =
            count_calls(RetryPolicy::new(3, 0), |_| Err::<u32, _>(not_found())).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(SheetsError::NotFound { .. })));
    }
}
