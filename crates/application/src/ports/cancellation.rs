//! Cooperative cancellation for in-flight executions.

use std::sync::Arc;

use tokio::sync::watch;

/// Owner side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns a receiver observing this token.
    #[must_use]
    pub fn subscribe(&self) -> CancellationReceiver {
        CancellationReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Signals cancellation to every receiver.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationReceiver {
    receiver: watch::Receiver<bool>,
}

impl CancellationReceiver {
    /// Returns true if cancellation was signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when cancellation is signalled. Never completes if the
    /// token is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_receiver_observes_cancel() {
        let token = CancellationToken::new();
        let mut receiver = token.subscribe();
        assert!(!receiver.is_cancelled());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), receiver.cancelled())
            .await
            .expect("cancellation should be observed");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_token_never_cancels() {
        let token = CancellationToken::new();
        let mut receiver = token.subscribe();
        drop(token);

        let waited = tokio::time::timeout(Duration::from_millis(50), receiver.cancelled()).await;
        assert!(waited.is_err());
    }
}
