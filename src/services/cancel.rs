//! Caller-driven cancellation and timeouts for store operations

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{GuardError, Result};

/// Cloneable cancellation signal shared between a caller and in-flight calls
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Abort every call observing this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call limits
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelHandle>,
}

impl CallOptions {
    /// Builder: set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder: observe a cancellation handle
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Run `operation`, aborting it on cancellation or timeout.
///
/// Aborting drops the in-flight future, and blocking-pool file operations it
/// started may still finish. Only wrap work that is safe to abandon; manifest
/// writes are committed outside this guard.
pub async fn run_guarded<T, F>(
    operation: &str,
    target: &str,
    options: &CallOptions,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let cancelled = async {
        match &options.cancel {
            Some(cancel) => cancel.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    let bounded = async {
        match options.timeout {
            Some(after) => match tokio::time::timeout(after, future).await {
                Ok(result) => result,
                Err(_) => Err(GuardError::Timeout {
                    operation: operation.to_string(),
                    target: target.to_string(),
                    after,
                }),
            },
            None => future.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => Err(GuardError::Cancelled {
            operation: operation.to_string(),
            target: target.to_string(),
        }),
        result = bounded => result,
    }
}
