//! Request-scoped cancellation and deadline.
//!
//! The core only carries a [`Context`] through to storage drivers and hooks;
//! drivers decide how to honor it, typically through [`Context::run`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::storage::StorageError;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancellation flag plus optional deadline. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Arc<CancelState>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::new().deadline_at(deadline)
    }

    /// Derives a context sharing this one's cancellation with a new deadline.
    #[must_use]
    pub fn deadline_at(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: Arc::clone(&self.cancel),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancel.cancelled.store(true, Ordering::SeqCst);
        self.cancel.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.cancelled.load(Ordering::SeqCst)
    }

    /// Fails fast when the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// [`StorageError::Cancelled`] or [`StorageError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), StorageError> {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(StorageError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves when the context is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.cancel.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drives `fut` until it completes, the context is cancelled or the deadline passes.
    ///
    /// # Errors
    ///
    /// [`StorageError::Cancelled`] or [`StorageError::DeadlineExceeded`].
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, StorageError> {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            out = fut => Ok(out),
            () = self.cancelled() => Err(StorageError::Cancelled),
            () = deadline => Err(StorageError::DeadlineExceeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = Context::new();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancel_is_shared_by_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(StorageError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_work() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(StorageError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::from_millis(5));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(matches!(result, Err(StorageError::DeadlineExceeded)));
    }
}
