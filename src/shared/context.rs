//! Operation context
//!
//! Carries the caller's deadline and cancellation signal into every store
//! operation. An operation interrupted here drops its in-flight future, which
//! drops any open unit of work and rolls its transaction back.

use std::future::{pending, Future};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use crate::shared::DomainError;

/// Cancellation trigger that can be cloned and shared across tasks
#[derive(Clone)]
pub struct CancelSignal {
    sender: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            debug!("Cancel signal triggered");
            let _ = self.sender.send(());
        }
    }

    /// Resolves once `cancel` has been called, including before this call.
    pub async fn cancelled(&self) {
        let mut rx = self.sender.subscribe();
        if self.is_triggered() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Deadline and cancellation supplied by the caller of a store operation.
#[derive(Clone, Default)]
pub struct OperationContext {
    deadline: Option<Instant>,
    cancel: CancelSignal,
}

impl OperationContext {
    /// No deadline, never cancelled unless `cancel_signal().cancel()` is called.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline(Instant::now() + timeout)
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    /// Drive `operation` to completion unless the context ends first.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        if self.cancel.is_triggered() {
            return Err(DomainError::Cancelled);
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            result = operation => result,
            _ = self.cancel.cancelled() => Err(DomainError::Cancelled),
            _ = expired => Err(DomainError::DeadlineExceeded),
        }
    }
}
