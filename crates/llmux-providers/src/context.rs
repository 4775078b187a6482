//! Request context — cancellation and deadlines for a single chat call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;

/// Cancellation handle plus optional deadline, passed to every `chat` call.
///
/// Cloning shares the cancellation token, so cancelling any clone aborts every
/// request bound to it.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never times out and is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to an existing cancellation token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        RequestContext {
            cancel,
            deadline: None,
        }
    }

    /// Set a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The underlying token, e.g. to cancel from a signal handler.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. The losing future is dropped, which aborts any
    /// in-flight HTTP request or child process it owns.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ProviderError::Cancelled),
                res = fut => res,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(ProviderError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}
