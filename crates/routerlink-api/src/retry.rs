//! Bounded retry with linear backoff.
//!
//! Every control-plane operation funnels through [`RetryPolicy::run`]. Only
//! classified transport failures are repeated; authentication failures,
//! parse errors and closed-client errors return on the spot. The wait after
//! attempt `n` is `n * base_delay`, so with three attempts and a one-second
//! base the caller sees waits of 1s then 2s before the final error.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::Error;

/// Attempt budget and backoff unit for one logical operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `attempts` below 1 is raised to 1.
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_delay_base)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait inserted after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Upper bound on wall time for one operation: every attempt times out
    /// and every backoff is served. There is no deadline across attempts.
    pub fn worst_case(&self, per_attempt_timeout: Duration) -> Duration {
        let backoff = (1..self.attempts).fold(Duration::ZERO, |acc, n| {
            acc.saturating_add(self.delay_after(n))
        });
        per_attempt_timeout
            .saturating_mul(self.attempts)
            .saturating_add(backoff)
    }

    /// Drive `op` until it succeeds, fails terminally, or the budget runs out.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// unchanged.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, Error>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(Error::Connection(err)) if err.is_retryable() && attempt < self.attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        code = %err.code,
                        host = %err.host,
                        "request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "giving up on request");
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_RETRY_ATTEMPTS,
            crate::config::DEFAULT_RETRY_DELAY_BASE,
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::time::Instant;

    use super::*;
    use crate::error::{ConnectionError, ConnectionErrorCode};

    fn failure(code: ConnectionErrorCode) -> Error {
        ConnectionError::new(code, "simulated", "10.0.0.1", 443).into()
    }

    /// Run `policy` against an op that always fails with `code`, returning
    /// the instants at which each attempt started.
    async fn record_attempts(
        policy: RetryPolicy,
        code: ConnectionErrorCode,
    ) -> (Vec<Instant>, Error) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let err = policy
            .run(|_| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(Instant::now());
                    Err::<(), _>(failure(code))
                }
            })
            .await
            .unwrap_err();
        let seen = seen.lock().unwrap().clone();
        (seen, err)
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_use_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1_000));
        let (seen, err) = record_attempts(policy, ConnectionErrorCode::Timeout).await;

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1] - seen[0], Duration::from_millis(1_000));
        assert_eq!(seen[2] - seen[1], Duration::from_millis(2_000));
        assert_eq!(err.connection_code(), Some(ConnectionErrorCode::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_count_matches_budget() {
        for n in 1..=6 {
            let policy = RetryPolicy::new(n, Duration::from_millis(100));
            let (seen, err) =
                record_attempts(policy, ConnectionErrorCode::ConnectionFailed).await;

            assert_eq!(seen.len(), usize::try_from(n).unwrap());
            let total = *seen.last().unwrap() - seen[0];
            // 100ms * (1 + 2 + ... + n-1)
            assert_eq!(total, Duration::from_millis(100 * u64::from(n * (n - 1) / 2)));
            assert_eq!(
                err.connection_code(),
                Some(ConnectionErrorCode::ConnectionFailed)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_is_never_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1_000));
        let start = Instant::now();
        let (seen, err) =
            record_attempts(policy, ConnectionErrorCode::AuthenticationFailed).await;

        assert_eq!(seen.len(), 1);
        assert_eq!(Instant::now() - start, Duration::ZERO);
        assert!(err.is_auth_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn parse_errors_are_terminal() {
        let calls = Arc::new(Mutex::new(0_u32));
        let result: Result<(), Error> = RetryPolicy::new(3, Duration::from_millis(10))
            .run(|_| {
                let calls = Arc::clone(&calls);
                async move {
                    *calls.lock().unwrap() += 1;
                    Err(Error::Deserialization {
                        message: "expected value".into(),
                        body: "<html>".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Deserialization { .. })));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_later_attempt() {
        let value = RetryPolicy::new(3, Duration::from_millis(10))
            .run(|attempt| async move {
                if attempt < 2 {
                    Err(failure(ConnectionErrorCode::ConnectionFailed))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    #[test]
    fn worst_case_latency() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1_000));
        assert_eq!(
            policy.worst_case(Duration::from_millis(10_000)),
            Duration::from_millis(33_000)
        );
    }
}
