//! Bounded retry with exponential backoff.

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, warn};

use crate::CancelToken;

/// How many times to try an operation and how long to wait in between.
///
/// The delay before retry `n` (1-based) is `base_delay * factor^(n-1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    factor: u32,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            factor: 2,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// What became of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Done { value: T, attempts: u32 },
    /// The last attempt's error: terminal, or retryable with attempts exhausted.
    Failed { error: E, attempts: u32 },
    /// Cancelled before the operation succeeded.
    Cancelled { attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Done { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries `max_attempts` times (at least once).
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Try once, never retry.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor.max(1);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the `retry`-th retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1);
        let multiplier = self.factor.checked_pow(exp).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails terminally, runs out of attempts,
    /// or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. Only errors for which
    /// `retryable` returns true are tried again.
    pub fn run<T, E, F, R>(&self, cancel: &CancelToken, mut op: F, retryable: R) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return RetryOutcome::Cancelled { attempts: attempt };
            }
            attempt += 1;

            let error = match op(attempt) {
                Ok(value) => {
                    return RetryOutcome::Done {
                        value,
                        attempts: attempt,
                    }
                }
                Err(error) => error,
            };

            if !retryable(&error) {
                debug!(attempt, %error, "not retryable");
                return RetryOutcome::Failed {
                    error,
                    attempts: attempt,
                };
            }
            if attempt >= self.max_attempts {
                warn!(attempt, %error, "giving up after {} attempts", self.max_attempts);
                return RetryOutcome::Failed {
                    error,
                    attempts: attempt,
                };
            }

            let delay = self.delay_for(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, %error, "retrying");
            if !cancel.sleep(delay) {
                return RetryOutcome::Cancelled { attempts: attempt };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Instant;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    #[test]
    fn delays_grow_and_cap() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100))
            .with_factor(2)
            .with_max_delay(Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(4, Duration::from_millis(1));
        let outcome = policy.run(
            &CancelToken::new(),
            |_| {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(TestError::Transient)
                } else {
                    Ok("done")
                }
            },
            transient,
        );
        assert!(matches!(
            outcome,
            RetryOutcome::Done {
                value: "done",
                attempts: 3
            }
        ));
    }

    #[test]
    fn terminal_error_stops_immediately() {
        let policy = RetryPolicy::new(4, Duration::from_millis(1));
        let outcome: RetryOutcome<(), _> =
            policy.run(&CancelToken::new(), |_| Err(TestError::Fatal), transient);
        assert!(matches!(
            outcome,
            RetryOutcome::Failed {
                error: TestError::Fatal,
                attempts: 1
            }
        ));
    }

    #[test]
    fn exhausts_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let outcome: RetryOutcome<(), _> =
            policy.run(&CancelToken::new(), |_| Err(TestError::Transient), transient);
        assert!(matches!(
            outcome,
            RetryOutcome::Failed {
                error: TestError::Transient,
                attempts: 3
            }
        ));
    }

    #[test]
    fn waits_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let start = Instant::now();
        let _: RetryOutcome<(), _> =
            policy.run(&CancelToken::new(), |_| Err(TestError::Transient), transient);
        // 20ms + 40ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn cancelled_before_first_attempt() {
        let token = CancelToken::new();
        token.cancel();
        let outcome: RetryOutcome<(), TestError> =
            RetryPolicy::default().run(&token, |_| panic!("must not run"), transient);
        assert!(matches!(outcome, RetryOutcome::Cancelled { attempts: 0 }));
    }

    #[test]
    fn cancel_interrupts_backoff() {
        let token = CancelToken::new();
        let policy = RetryPolicy::new(5, Duration::from_secs(60));
        let start = Instant::now();
        let outcome: RetryOutcome<(), _> = policy.run(
            &token,
            |_| {
                token.cancel();
                Err(TestError::Transient)
            },
            transient,
        );
        assert!(matches!(outcome, RetryOutcome::Cancelled { attempts: 1 }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
