//! Retry orchestration with bounded exponential backoff.
//!
//! Wraps one full pipeline attempt (synthesize → normalize → resolve →
//! validate → execute). Every attempt error is treated as retryable: the
//! generation step is non-deterministic, so the next attempt may produce
//! a script that passes. Exhaustion yields an explicit
//! [`RetryOutcome::Exhausted`] value; callers must map it to a structured
//! user-facing error rather than propagate a crash.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Result;

/// Retry policy for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retries).
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Delay slept before the retry that follows attempt `attempt_index`
    /// (0-based): `initial_delay * 2^attempt_index`, saturating at
    /// `u64::MAX` milliseconds rather than overflowing for large
    /// configured attempt counts.
    pub fn delay_before_retry(&self, attempt_index: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt_index).unwrap_or(u64::MAX);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }
}

/// Terminal outcome of a retried operation.
///
/// `Exhausted` is the designated "no usable result" value; it carries the
/// last failure cause for the caller's structured error report.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Completed { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl<T> RetryOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, RetryOutcome::Completed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Completed { attempts, .. } => *attempts,
            RetryOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            RetryOutcome::Completed { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Run `attempt_fn` up to `policy.max_attempts` times with exponential
/// backoff between attempts. No sleep follows the final attempt.
///
/// `attempt_fn` receives the 0-based attempt index.
pub async fn run_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = "no attempts were made".to_string();

    for index in 0..policy.max_attempts {
        match attempt_fn(index).await {
            Ok(value) => {
                return RetryOutcome::Completed {
                    value,
                    attempts: index + 1,
                };
            }
            Err(err) => {
                warn!(
                    event = "retry.attempt_failed",
                    attempt = index + 1,
                    max_attempts = policy.max_attempts,
                    error = %err,
                );
                last_error = err.to_string();
            }
        }

        if index + 1 < policy.max_attempts {
            let delay = policy.delay_before_retry(index);
            debug!(event = "retry.backoff", delay_ms = delay.as_millis() as u64);
            tokio::time::sleep(delay).await;
        }
    }

    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DiagenError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn policy(max_attempts: u32, initial_delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay_ms,
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let outcome = run_with_backoff(&policy(3, 10), |_| async { Ok(7u32) }).await;
        assert_eq!(
            outcome,
            RetryOutcome::Completed {
                value: 7,
                attempts: 1
            }
        );
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let counter = Arc::new(AtomicU32::new(0));
        let outcome = run_with_backoff(&policy(3, 1), |_| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::Relaxed) < 2 {
                    Err(DiagenError::Synthesis("transient".to_string()))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Completed {
                value: "recovered",
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_exhaustion_is_a_sentinel_not_a_panic() {
        let outcome: RetryOutcome<()> = run_with_backoff(&policy(2, 1), |_| async {
            Err(DiagenError::Synthesis("always fails".to_string()))
        })
        .await;

        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("always fails"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attempt_count_is_bounded() {
        let counter = Arc::new(AtomicU32::new(0));
        let _: RetryOutcome<()> = run_with_backoff(&policy(3, 1), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::Relaxed);
                Err(DiagenError::Synthesis("nope".to_string()))
            }
        })
        .await;
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_double() {
        // Paused time makes sleeps deterministic, so the measured
        // inter-attempt gaps are exactly initial_delay * 2^k.
        let starts: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let _: RetryOutcome<()> = run_with_backoff(&policy(3, 50), |_| {
            let starts = starts.clone();
            async move {
                starts.lock().unwrap().push(tokio::time::Instant::now());
                Err(DiagenError::Synthesis("fail".to_string()))
            }
        })
        .await;

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        assert_eq!((starts[1] - starts[0]).as_millis(), 50);
        assert_eq!((starts[2] - starts[1]).as_millis(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sleep_after_final_attempt() {
        let begin = tokio::time::Instant::now();
        let _: RetryOutcome<()> = run_with_backoff(&policy(2, 50), |_| async {
            Err(DiagenError::Synthesis("fail".to_string()))
        })
        .await;
        // One backoff between the two attempts, none after the last.
        assert_eq!(begin.elapsed().as_millis(), 50);
    }

    #[test]
    fn test_delay_schedule() {
        let p = policy(4, 1_000);
        assert_eq!(p.delay_before_retry(0), Duration::from_millis(1_000));
        assert_eq!(p.delay_before_retry(1), Duration::from_millis(2_000));
        assert_eq!(p.delay_before_retry(2), Duration::from_millis(4_000));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let p = policy(200, 1_000);
        assert_eq!(p.delay_before_retry(70), Duration::from_millis(u64::MAX));
        assert_eq!(p.delay_before_retry(200), Duration::from_millis(u64::MAX));

        let p = policy(2, u64::MAX);
        assert_eq!(p.delay_before_retry(1), Duration::from_millis(u64::MAX));
    }
}
