//! Cancellable-wait primitive shared by every blocking operation.
//!
//! Deadlines and cancellation are always passed explicitly; nothing in the
//! control plane blocks without an escape hatch. The token is level-based:
//! once canceled it stays canceled, and every clone observes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A shareable cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every current and future waiter.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Resolves once the token is canceled. Registering the waiter before
    /// checking the flag closes the window where a cancel between check and
    /// await would be missed.
    pub async fn canceled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_uncanceled() {
        let token = CancelToken::new();
        assert!(!token.is_canceled());
        // canceled() must not resolve yet.
        let wait = tokio::time::timeout(Duration::from_millis(20), token.canceled());
        assert!(wait.await.is_err());
    }

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.canceled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(token.is_canceled());
    }

    #[tokio::test]
    async fn cancel_before_wait_resolves_immediately() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.canceled())
            .await
            .expect("already-canceled token resolves immediately");
    }
}
