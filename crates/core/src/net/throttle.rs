//! Request pacing and retry policy.
//!
//! Every outbound request flows through a shared [`Throttler`], which
//! enforces a minimum spacing between dispatches and retries rate-limited
//! or transient failures with a fixed backoff.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{AttemptError, FetchError};

/// Minimum gap between any two dispatched requests.
pub const MIN_REQUEST_SPACING: Duration = Duration::from_millis(1000);
/// Total attempts per operation, including the first.
pub const DEFAULT_RETRIES: u32 = 3;
/// Fixed wait before a retry.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(5000);

/// Paces and retries request attempts.
///
/// Cloning produces handles onto the same pacing clock, so all clones
/// share the one-request-per-second budget.
#[derive(Clone)]
pub struct Throttler {
    last_dispatch: Arc<Mutex<Option<Instant>>>,
    spacing: Duration,
    retries: u32,
    backoff: Duration,
}

impl Default for Throttler {
    fn default() -> Self {
        Self::new()
    }
}

impl Throttler {
    /// Throttler with the standard spacing and retry budget.
    pub fn new() -> Self {
        Self {
            last_dispatch: Arc::new(Mutex::new(None)),
            spacing: MIN_REQUEST_SPACING,
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Throttler with custom timings, for tests and unusual deployments.
    pub fn with_policy(spacing: Duration, retries: u32, backoff: Duration) -> Self {
        Self {
            last_dispatch: Arc::new(Mutex::new(None)),
            spacing,
            retries: retries.max(1),
            backoff,
        }
    }

    /// Wait until the pacing clock permits the next dispatch, then claim it.
    ///
    /// The timestamp advances on every attempt, including retries, so a
    /// retried operation still counts against the shared budget.
    async fn pace(&self) {
        let wait = {
            let mut last = self.last_dispatch.lock();
            let now = Instant::now();
            let wait = match *last {
                Some(stamp) => self.spacing.saturating_sub(now.duration_since(stamp)),
                None => Duration::ZERO,
            };
            *last = Some(now + wait);
            wait
        };
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "pacing request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Run one attempt factory to completion under pacing and retry policy.
    ///
    /// Rate-limited and transient attempts are retried after the fixed
    /// backoff until the budget runs out; an invalid-request attempt fails
    /// immediately with no retry.
    pub async fn run<T, F, Fut>(&self, label: &str, attempt: F) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut last_transient = None;
        for round in 1..=self.retries {
            self.pace().await;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Invalid(message)) => {
                    return Err(FetchError::InvalidRequest(message));
                }
                Err(AttemptError::RateLimited) => {
                    warn!(label, round, "rate limited, backing off");
                    last_transient = None;
                }
                Err(AttemptError::Transient(message)) => {
                    warn!(label, round, %message, "attempt failed");
                    last_transient = Some(message);
                }
            }
            if round < self.retries {
                tokio::time::sleep(self.backoff).await;
            }
        }
        match last_transient {
            Some(message) => Err(FetchError::Transient(message)),
            None => Err(FetchError::RateLimitExceeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn dispatches_are_spaced_out() {
        let throttler = Throttler::new();
        let start = Instant::now();
        for _ in 0..3 {
            throttler
                .run("test", || async { Ok::<_, AttemptError>(()) })
                .await
                .expect("attempt succeeds");
        }
        // First dispatch is immediate, the next two each wait a second.
        assert!(Instant::now().duration_since(start) >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_attempts_are_retried_then_fail() {
        let throttler = Throttler::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: Result<(), _> = throttler
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AttemptError::RateLimited)
                }
            })
            .await;
        assert!(matches!(result, Err(FetchError::RateLimitExceeded)));
        assert_eq!(attempts.load(Ordering::SeqCst), DEFAULT_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_then_success_recovers() {
        let throttler = Throttler::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let value = throttler
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AttemptError::RateLimited)
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await
            .expect("second attempt succeeds");
        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_request_is_never_retried() {
        let throttler = Throttler::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: Result<(), _> = throttler
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AttemptError::Invalid("bad id".to_string()))
                }
            })
            .await;
        assert!(matches!(result, Err(FetchError::InvalidRequest(message)) if message == "bad id"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_surface_last_message() {
        let throttler = Throttler::new();
        let result: Result<(), _> = throttler
            .run("test", || async {
                Err(AttemptError::Transient("connection reset".to_string()))
            })
            .await;
        assert!(
            matches!(result, Err(FetchError::Transient(message)) if message == "connection reset")
        );
    }
}
