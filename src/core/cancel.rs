//! Cancellation primitives for upstream forwarding.
//!
//! [`CallerCancel`] tracks whether the caller is still listening.
//! [`ForwardSignal`] merges it with the optional non-streaming deadline into
//! the one signal every suspension point in the forwarding engine waits on.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Handle for cancelling a forwarding operation when the caller goes away.
#[derive(Clone, Debug)]
pub struct CallerCancel {
    token: CancellationToken,
    /// Set once the operation finished normally, so a later drop is not a disconnect
    completed: Arc<AtomicBool>,
}

impl CallerCancel {
    /// Wrap a per-request token, usually a child of the server shutdown token.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the operation as completed normally.
    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Signal cancellation (only if not already completed).
    pub fn cancel(&self) {
        if !self.is_completed() {
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for CallerCancel {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Cancels the caller handle when dropped before completion.
///
/// Hyper drops the handler future, or the response body, when the caller
/// disconnects; holding this guard turns that drop into a cancellation.
#[derive(Debug)]
pub struct DisconnectGuard {
    handle: CallerCancel,
    /// Logged on disconnect; the body can outlive the `REQUEST_ID` scope
    request_id: String,
}

impl DisconnectGuard {
    pub fn new(handle: CallerCancel, request_id: impl Into<String>) -> Self {
        Self {
            handle,
            request_id: request_id.into(),
        }
    }

    /// Disarm the guard: the operation ended normally.
    pub fn complete(&self) {
        self.handle.mark_completed();
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.handle.is_completed() {
            tracing::debug!(
                request_id = %self.request_id,
                "Client disconnect detected - forwarding cancelled"
            );
        }
        self.handle.cancel();
    }
}

/// Why a [`ForwardSignal`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller disconnected (or the server is shutting down)
    CallerGone,
    /// The non-streaming deadline elapsed
    DeadlineElapsed,
}

/// Caller cancellation merged with an optional deadline.
#[derive(Clone, Debug)]
pub struct ForwardSignal {
    caller: CancellationToken,
    deadline: Option<Instant>,
}

impl ForwardSignal {
    /// Build the signal; the deadline, if any, is measured from now.
    pub fn new(caller: &CallerCancel, timeout: Option<Duration>) -> Self {
        Self {
            caller: caller.token().clone(),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Resolves when either source fires.
    pub async fn fired(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.caller.cancelled() => CancelReason::CallerGone,
                    _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineElapsed,
                }
            }
            None => {
                self.caller.cancelled().await;
                CancelReason::CallerGone
            }
        }
    }

    /// Run `fut` unless the signal fires first, in which case `fut` is dropped.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, CancelReason>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            reason = self.fired() => Err(reason),
            output = fut => Ok(output),
        }
    }
}
