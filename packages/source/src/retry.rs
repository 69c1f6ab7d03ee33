//! Bounded retry with exponential backoff for transient fetch errors.
//!
//! The default policy makes no retries, so a failing request is reported
//! immediately and paging stops (see [`crate::paging`]). Runs that need to
//! ride out a flaky endpoint raise [`RetryPolicy::max_retries`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SourceError;

/// How often and how patiently to retry a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry, in seconds. Doubles on each further
    /// retry (2s, 4s, 8s, ...).
    pub base_delay_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_secs: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy allowing `max_retries` retries with the default backoff.
    #[must_use]
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2f64.powi(i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX));
        Duration::try_from_secs_f64(self.base_delay_secs * factor).unwrap_or(Duration::ZERO)
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or the policy runs
/// out of retries.
///
/// `attempt` receives the zero-based attempt number. Only errors for which
/// [`SourceError::is_transient`] holds are retried; HTTP 4xx other than 429
/// is returned straight away.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// permanent error.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, SourceError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut n = 0;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) if n < policy.max_retries && e.is_transient() => {
                n += 1;
                let delay = policy.delay_for(n);
                log::warn!("  transient error: {e}");
                log::warn!("  retry {n}/{} in {delay:?}...", policy.max_retries);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unavailable() -> SourceError {
        SourceError::Status {
            status: 503,
            url: "http://example.invalid".to_string(),
        }
    }

    fn instant(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay_secs: 0.0,
        }
    }

    #[tokio::test]
    async fn default_policy_fails_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&RetryPolicy::default(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry(&instant(3), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(unavailable()) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&instant(2), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&instant(5), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(SourceError::Status {
                    status: 404,
                    url: "http://example.invalid".to_string(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::with_retries(3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn rate_limit_is_transient() {
        let e = SourceError::Status {
            status: 429,
            url: String::new(),
        };
        assert!(e.is_transient());
    }
}
