use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation for a single query. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender: Arc::new(sender), receiver }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.receiver.clone();
        // The sender lives as long as this token, so the wait cannot fail.
        let _ = rx.wait_for(|c| *c).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn clones_observe_cancel() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());

        let waiter = tokio::spawn(async move { other.cancelled().await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(token.is_cancelled());
    }
}
