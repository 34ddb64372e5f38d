//! # Shutdown Token
//!
//! Cooperative cancellation for the distribution loop. One token is
//! created at startup, cloned into the signal handler and every
//! component that sleeps; `request()` flips an atomic flag and wakes all
//! waiters. Awaits on network responses are not interrupted — only idle
//! waits and pacing sleeps observe the token, so a round that has begun
//! paying always finishes its submissions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Clonable handle signalling process shutdown.
#[derive(Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals shutdown. Idempotent.
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown is requested. Registers interest before
    /// checking the flag, so a request landing between the check and the
    /// await cannot be missed.
    pub async fn requested(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }

    /// Sleeps for `duration`, waking early on shutdown.
    ///
    /// Returns `true` when the full duration elapsed and `false` when
    /// shutdown cut the sleep short (or was already requested).
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_requested() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.requested() => false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
