//! Deadline-bounded retry with exponential backoff
//!
//! Resource operations call remote APIs that fail transiently. An operation
//! classifies each failure as [`RetryError::Retryable`] or
//! [`RetryError::NonRetryable`]; [`retry_context`] keeps retrying the former
//! until the operation timeout or the context deadline passes, whichever is
//! earlier.

use crate::context::{deadline_after, Context};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Classification of a single failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    Retryable(E),
    NonRetryable(E),
}

/// Exponential backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
            factor: 2,
        }
    }
}

impl Backoff {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(multiplier).min(self.max)
    }
}

/// Terminal outcome of a retried operation
#[derive(Debug, thiserror::Error)]
pub enum RetryFailure<E> {
    #[error("{0}")]
    Failed(E),

    #[error("timed out after {elapsed:?}")]
    Timeout { elapsed: Duration, last: Option<E> },

    #[error("operation cancelled")]
    Cancelled { last: Option<E> },
}

impl<E> RetryFailure<E> {
    /// The last error observed before giving up, if any attempt completed
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryFailure::Failed(e) => Some(e),
            RetryFailure::Timeout { last, .. } | RetryFailure::Cancelled { last } => last.as_ref(),
        }
    }
}

/// Runs `op` until it succeeds, returns a non-retryable error, or the
/// deadline passes. The deadline is `timeout` from now, capped by the
/// context's own deadline. Each attempt is itself bounded by the deadline and
/// cancelling `ctx` aborts both attempts and backoff sleeps.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_context<T, E, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    backoff: Backoff,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: Display,
{
    let start = Instant::now();
    let deadline = match ctx.deadline() {
        Some(ctx_deadline) => ctx_deadline.min(deadline_after(start, timeout)),
        None => deadline_after(start, timeout),
    };

    let mut attempt = 0;
    let mut last = None;

    loop {
        if ctx.is_cancelled() {
            return Err(RetryFailure::Cancelled { last });
        }
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(RetryFailure::Cancelled { last }),
            result = tokio::time::timeout_at(deadline.into(), op(attempt)) => result,
        };

        match outcome {
            Err(_) => {
                tracing::warn!(attempt, "attempt exceeded the operation deadline");
                return Err(RetryFailure::Timeout {
                    elapsed: start.elapsed(),
                    last,
                });
            }
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(RetryError::NonRetryable(e))) => {
                tracing::debug!(attempt, error = %e, "non-retryable failure");
                return Err(RetryFailure::Failed(e));
            }
            Ok(Err(RetryError::Retryable(e))) => {
                tracing::warn!(attempt, error = %e, "retryable failure");
                last = Some(e);
            }
        }

        let delay = backoff.delay(attempt);
        if deadline.saturating_duration_since(Instant::now()) <= delay {
            return Err(RetryFailure::Timeout {
                elapsed: start.elapsed(),
                last,
            });
        }

        tracing::debug!("Retrying after {}ms (attempt {})", delay.as_millis(), attempt);
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(RetryFailure::Cancelled { last }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
