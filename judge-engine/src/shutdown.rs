//! Cooperative shutdown signal shared by all sync tasks.

use tokio::sync::watch;

/// Create a linked trigger/signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half: requests every linked [`Shutdown`] to stop.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, checked by the sync loops at every page boundary.
///
/// Dropping the trigger without calling [`ShutdownTrigger::trigger`] never
/// counts as a shutdown request.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, shutdown) = shutdown_channel();
        shutdown
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|stop| *stop).await.is_err();
        if closed {
            // Trigger dropped without firing
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_untriggered() {
        let (_trigger, shutdown) = shutdown_channel();
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn trigger_reaches_all_signals() {
        let (trigger, shutdown) = shutdown_channel();
        let cloned = shutdown.clone();

        trigger.trigger();

        assert!(shutdown.is_triggered());
        assert!(cloned.is_triggered());
        tokio::time::timeout(Duration::from_millis(100), shutdown.triggered())
            .await
            .expect("triggered() should resolve after trigger");
    }

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let (trigger, shutdown) = shutdown_channel();
        trigger.trigger();
        trigger.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn never_does_not_fire() {
        let shutdown = Shutdown::never();
        assert!(!shutdown.is_triggered());

        let waited = tokio::time::timeout(Duration::from_millis(20), shutdown.triggered()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn waiter_wakes_on_trigger() {
        let (trigger, shutdown) = shutdown_channel();
        let waiter = tokio::spawn(async move { shutdown.triggered().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("waiter should wake")
            .expect("waiter should not panic");
    }
}
