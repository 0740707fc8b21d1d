//! Cancellation context.
//!
//! Every blocking operation in this crate takes a `Context`. Cancelling it makes the
//! next subprocess or stage fail fast; a subprocess already running is killed.
//! Timeouts are expressed by the caller through [`Context::cancel_after`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Returned when work is refused or interrupted because the context was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Cloneable cancellation handle. All clones observe the same cancellation.
#[derive(Debug, Clone)]
pub struct Context {
  cancel: Arc<watch::Sender<bool>>,
}

impl Default for Context {
  fn default() -> Self {
    Self::new()
  }
}

impl Context {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(false);
    Self { cancel: Arc::new(tx) }
  }

  /// Cancel this context and every clone of it. Idempotent.
  pub fn cancel(&self) {
    self.cancel.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.cancel.borrow()
  }

  /// `Err(Cancelled)` once the context has been cancelled.
  pub fn check(&self) -> Result<(), Cancelled> {
    if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
  }

  /// Resolves once the context is cancelled (immediately if it already is).
  pub async fn cancelled(&self) {
    let mut rx = self.cancel.subscribe();
    // The sender is owned by `self`, so the channel stays open while we wait.
    let _ = rx.wait_for(|cancelled| *cancelled).await;
  }

  /// Cancel the context after `timeout` elapses.
  ///
  /// Must be called from within a tokio runtime. Aborting the returned handle
  /// disarms the timer.
  pub fn cancel_after(&self, timeout: Duration) -> JoinHandle<()> {
    let ctx = self.clone();
    tokio::spawn(async move {
      tokio::time::sleep(timeout).await;
      ctx.cancel();
    })
  }
}
