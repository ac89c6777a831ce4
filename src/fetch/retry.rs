use crate::config::{Backoff, Config};
use crate::models::{FailureKind, FetchOutcome};
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// Attempts are never spaced closer than this, whatever the configured delay.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(10);

/// 有界重试
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_attempts, config.retry_delay, config.retry_backoff)
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay * attempt,
        };
        delay.max(MIN_RETRY_DELAY)
    }

    /// Run `op` until it yields records, a non-retryable failure, or the
    /// attempt budget is spent.
    pub async fn run<F, Fut>(&self, label: &str, mut op: F) -> FetchOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_attempts {
            match op().await {
                outcome @ FetchOutcome::Success { .. } => {
                    if attempt > 1 {
                        debug!("{} 第 {} 次尝试成功", label, attempt);
                    }
                    return outcome;
                }
                FetchOutcome::Empty => {
                    last_error = "empty result".to_string();
                }
                FetchOutcome::Failure(failure) if failure.kind.is_retryable() => {
                    last_error = failure.message;
                }
                failure @ FetchOutcome::Failure(_) => return failure,
            }

            if attempt < self.max_attempts {
                let wait = self.delay_after(attempt);
                warn!(
                    "{} 第 {}/{} 次尝试失败: {}，{:?} 后重试",
                    label, attempt, self.max_attempts, last_error, wait
                );
                tokio::time::sleep(wait).await;
            } else {
                warn!("{} 第 {}/{} 次尝试失败: {}", label, attempt, self.max_attempts, last_error);
            }
        }

        FetchOutcome::failure(
            FailureKind::MaxRetriesExceeded,
            format!("max retries exceeded: {}", last_error),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalRecord, FetchFailure};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn one_record() -> Vec<CanonicalRecord> {
        vec![CanonicalRecord::point(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 1.0)]
    }

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Backoff::Fixed)
    }

    #[tokio::test]
    async fn retries_empty_until_success() {
        let calls = AtomicU32::new(0);
        let outcome = fast(3)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    FetchOutcome::Empty
                } else {
                    FetchOutcome::success(one_record())
                }
            })
            .await;
        assert!(outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome = fast(3)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::transient("connection reset")
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match outcome {
            FetchOutcome::Failure(FetchFailure { kind, message }) => {
                assert_eq!(kind, FailureKind::MaxRetriesExceeded);
                assert_eq!(message, "max retries exceeded: connection reset");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn terminal_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let outcome = fast(5)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::terminal("unsupported symbol")
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            outcome,
            FetchOutcome::Failure(FetchFailure { kind: FailureKind::Terminal, .. })
        ));
    }

    #[test]
    fn delay_has_floor_and_grows_linearly() {
        let fixed = RetryPolicy::new(3, Duration::ZERO, Backoff::Fixed);
        assert_eq!(fixed.delay_after(2), MIN_RETRY_DELAY);

        let linear = RetryPolicy::new(3, Duration::from_millis(100), Backoff::Linear);
        assert_eq!(linear.delay_after(1), Duration::from_millis(100));
        assert_eq!(linear.delay_after(3), Duration::from_millis(300));
    }
}
