//! Cooperative cancellation for a single session.
//!
//! A [`CancellationToken`] moves through `Running -> Requested -> Completed`,
//! and [`reset`](CancellationToken::reset) re-arms it for the next run.
//! The orchestrator checks it at every suspension point (provider call, tool
//! execution, approval wait, throttle and backoff sleeps). Work already in
//! flight is never interrupted; only waits observe the signal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::{KernelError, Result};

/// Lifecycle of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationState {
    /// No cancellation requested.
    Running,
    /// Cancellation requested; in-flight work is unwinding.
    Requested,
    /// The loop has observed the request and exited.
    Completed,
}

/// Shared, cloneable cancellation flag backed by a `watch` channel.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<CancellationState>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CancellationState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> CancellationState {
        *self.tx.borrow()
    }

    /// Request cancellation. Returns `true` if this call made the transition.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == CancellationState::Running {
                *state = CancellationState::Requested;
                true
            } else {
                false
            }
        })
    }

    /// Whether cancellation has been requested (or already completed).
    pub fn is_cancelled(&self) -> bool {
        self.state() != CancellationState::Running
    }

    /// Record that the loop has finished unwinding.
    pub fn mark_completed(&self) {
        self.tx.send_if_modified(|state| {
            if *state == CancellationState::Requested {
                *state = CancellationState::Completed;
                true
            } else {
                false
            }
        });
    }

    /// Re-arm the token after a cancelled run has finished unwinding.
    ///
    /// Only `Completed` goes back to `Running`; a request that has not been
    /// observed yet stays pending. Returns `true` if the token was re-armed.
    pub fn reset(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == CancellationState::Completed {
                *state = CancellationState::Running;
                true
            } else {
                false
            }
        })
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on a state change.
        let _ = rx
            .wait_for(|state| *state != CancellationState::Running)
            .await;
    }

    /// Return `Err(Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(KernelError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.check()?;
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(KernelError::Cancelled),
        }
    }

    /// Await `fut` unless cancelled first.
    pub async fn run_until_cancelled<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            out = fut => Ok(out),
            _ = self.cancelled() => Err(KernelError::Cancelled),
        }
    }
}
