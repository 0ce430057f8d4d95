//! Cooperative cancellation for fallback walks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cloneable cancellation handle.
///
/// The manager checks the flag at every candidate boundary and races
/// [`cancelled`](Self::cancelled) against the in-flight provider call, so
/// cancellation takes effect mid-call as well. The flag is set before
/// waiters are notified, which keeps the wait race-free.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the operation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            // Re-check after registering the waiter so a cancel between
            // the first check and registration is not missed.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
