//! Generic exponential-backoff wrapper for fallible async operations.
//!
//! Used for token refresh, profile fetch/update and connectivity probing.
//! Every invocation carries a [`CancelToken`]; logout bumps the cancel
//! generation so in-flight backoff timers and requests abort instead of
//! writing stale tokens after sign-out.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::warn;

use crate::error::AuthError;
use crate::models::PerformanceMetrics;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry. Doubles on each subsequent retry.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Cancellation source owned by the controller. Bumping the generation
/// cancels every token handed out before the bump.
pub struct CancelSource {
    tx: watch::Sender<u64>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Hand out a token tied to the current generation.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
            generation: *self.tx.borrow(),
        }
    }

    /// Cancel every outstanding token.
    pub fn cancel_all(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation handle checked between retry attempts and
/// raced against in-flight operations and backoff sleeps.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<u64>,
    generation: u64,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != self.generation
    }

    /// Resolve when this token is cancelled. Never resolves if the
    /// source outlives the token without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while *rx.borrow_and_update() == self.generation {
            if rx.changed().await.is_err() {
                // Source dropped without cancelling; stay pending.
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Retry policy: `max_retries` attempts, delay before attempt `i`
/// (0-indexed, i >= 1) is `initial_delay * 2^(i-1)`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
        }
    }
}

/// Shared-state backoff executor. Clones share the retry counter and
/// metrics sink, so the UI sees one coherent retry indicator.
#[derive(Clone)]
pub struct RetryExecutor {
    retry_count: Arc<AtomicU32>,
    metrics: Arc<Mutex<PerformanceMetrics>>,
}

impl RetryExecutor {
    pub fn new(retry_count: Arc<AtomicU32>, metrics: Arc<Mutex<PerformanceMetrics>>) -> Self {
        Self {
            retry_count,
            metrics,
        }
    }

    /// Current value of the shared retry counter.
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Run `operation` with the default policy.
    pub async fn perform_with_retry<T, F, Fut>(
        &self,
        name: &str,
        cancel: &CancelToken,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AuthError>>,
    {
        self.perform_with_policy(name, cancel, RetryPolicy::default(), operation)
            .await
    }

    /// Run `operation` up to `policy.max_retries` times with exponential
    /// backoff. On success the shared retry counter resets to 0 and the
    /// total elapsed time is recorded under `name`; on exhaustion the
    /// counter is set to `max_retries` and the last error is returned.
    pub async fn perform_with_policy<T, F, Fut>(
        &self,
        name: &str,
        cancel: &CancelToken,
        policy: RetryPolicy,
        mut operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AuthError>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                // Exponent is capped so oversized policies saturate
                // instead of overflowing the multiplier.
                let delay = policy
                    .initial_delay
                    .saturating_mul(2u32.pow((attempt - 1).min(10)));
                warn!(operation = name, attempt, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            if cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                result = operation() => result,
            };

            match result {
                Ok(value) => {
                    self.retry_count.store(0, Ordering::Relaxed);
                    self.metrics
                        .lock()
                        .expect("metrics lock")
                        .record(name, started.elapsed());
                    return Ok(value);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_retries {
                        self.retry_count.store(policy.max_retries, Ordering::Relaxed);
                        warn!(operation = name, error = %err, "Retries exhausted");
                        return Err(err);
                    }
                }
            }
        }
    }
}
