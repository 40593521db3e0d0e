//! Context implementation for request-scoped cancellation and deadlines
//!
//! Every callback the host makes into a provider receives a [`Context`]. It
//! carries an optional deadline and a cancellation signal that long-running
//! operations (HTTP calls, retry loops) must observe.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Upper bound for any deadline, matching what the timer wheel can hold
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `start + timeout`, clamped to a far-future instant instead of overflowing
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout.min(FAR_FUTURE))
        .unwrap_or(start)
}

/// Context carries request-scoped cancellation signals and deadlines
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derives a child context that is cancelled when `timeout` elapses or
    /// when this context is cancelled, whichever happens first. The child
    /// never outlives the parent's deadline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = deadline_after(Instant::now(), timeout);
        let deadline = match self.inner.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };

        let (done_tx, done_rx) = watch::channel(self.is_cancelled());

        let tx = done_tx.clone();
        let mut parent = self.inner.done.clone();
        tokio::spawn(async move {
            let parent_cancelled = async move {
                // A dropped parent can no longer cancel us; fall back to the deadline.
                if parent.wait_for(|cancelled| *cancelled).await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = parent_cancelled => {}
                _ = tx.closed() => return,
            }
            let _ = tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when the context has no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Resolves once this context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
