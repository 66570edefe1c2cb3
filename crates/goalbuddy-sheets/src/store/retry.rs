//! Rate-limit retry with exponential back-off.

use goalbuddy_core::config::SheetsConfig;
use goalbuddy_core::error::GoalError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently to retry throttled calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SheetsConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op`, retrying `RateLimited` failures. Other errors, and the last
    /// rate-limit error once retries run out, are returned as-is.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, GoalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GoalError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_rate_limited() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{what}: rate limited, retry {}/{} in {:?}",
                        attempt + 1,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_recovers_after_rate_limits() {
        let attempts = AtomicU32::new(0);
        let result = fast()
            .run("test", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GoalError::RateLimited("slow down".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("test", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(GoalError::RateLimited("slow down".into()))
            })
            .await;
        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_fail_fast() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("test", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(GoalError::Storage("boom".into()))
            })
            .await;
        assert!(matches!(result, Err(GoalError::Storage(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
