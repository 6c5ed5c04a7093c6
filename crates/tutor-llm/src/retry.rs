//! Fixed-interval bounded retry.
//!
//! Every model-backed stage wraps its call in [`call_with_retry`]. The
//! operation runs at most `max_attempts` times with a constant pause between
//! attempts; there is no jitter, growth or circuit breaking. The last error is
//! returned unchanged once the bound is reached.
//!
//! A non-idempotent operation may run its side effects up to `max_attempts`
//! times.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use tracing::{debug, error, warn};

use tutor_types::RetrySettings;

/// Attempt bound and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; zero is treated as one
    pub max_attempts: u32,

    /// Pause between a failed attempt and the next one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Attempt bound actually enforced.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.delay())
    }
}

/// Run `operation` until it succeeds or the policy's attempt bound is reached.
pub async fn call_with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.attempts();
    let mut backoff = Constant::new(policy.delay);
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!(attempt, max_attempts, "Invoking operation");

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_attempts {
                    error!(error = %e, attempts = attempt, "Max retries exceeded");
                    return Err(e);
                }

                let delay = backoff.next_backoff().unwrap_or(policy.delay);
                warn!(
                    error = %e,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
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

    #[derive(Debug, PartialEq)]
    struct Boom(u32);

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom #{}", self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_runs_exactly_n_times() {
        for n in 1..=5 {
            let calls = AtomicU32::new(0);
            let policy = RetryPolicy::new(n, Duration::from_secs(1));

            let result: Result<(), Boom> = call_with_retry(&policy, || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(Boom(call)) }
            })
            .await;

            assert_eq!(calls.load(Ordering::SeqCst), n);
            // The last error comes back unchanged
            assert_eq!(result, Err(Boom(n)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_attempt_k_stops_there() {
        for k in 1..=3 {
            let calls = AtomicU32::new(0);
            let policy = RetryPolicy::default();

            let result: Result<&str, Boom> = call_with_retry(&policy, || {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call < k {
                        Err(Boom(call))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

            assert_eq!(result, Ok("done"));
            assert_eq!(calls.load(Ordering::SeqCst), k);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let _: Result<(), Boom> = call_with_retry(&policy, || async { Err(Boom(0)) }).await;

        // Two pauses for three attempts, none after the last one
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::ZERO);

        let _: Result<(), Boom> = call_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Boom(1)) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let settings = RetrySettings {
            max_attempts: 5,
            delay_ms: 250,
        };
        let policy = RetryPolicy::from(&settings);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }
}
