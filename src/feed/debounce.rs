//! Quiescence-window debouncing for keystroke-driven searches

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default quiescence window for search input
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Delays values until input has been quiet for `window`.
///
/// Each [`push`](Self::push) cancels the pending delivery and schedules a
/// new one, so at most one value is delivered per quiet period. Dropping
/// the debouncer cancels whatever is pending. Must be used inside a tokio
/// runtime.
pub struct Debouncer<T> {
    window: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver that gets the settled values
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            tx,
            pending: None,
        };
        (debouncer, rx)
    }

    /// Schedule `value`, replacing anything still waiting
    pub fn push(&mut self, value: T) {
        self.cancel();

        let tx = self.tx.clone();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(value);
        }));
    }

    /// Drop the pending value, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a value is waiting for the window to elapse
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, sleep, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_burst_delivers_last_value_once() {
        let (mut debouncer, mut rx) = Debouncer::new(SEARCH_DEBOUNCE);

        debouncer.push("h");
        sleep(Duration::from_millis(100)).await;
        debouncer.push("he");
        sleep(Duration::from_millis(100)).await;
        debouncer.push("hey");
        let last_keystroke = Instant::now();

        let value = rx.recv().await.unwrap();
        assert_eq!(value, "hey");
        let waited = last_keystroke.elapsed();
        assert!(waited >= SEARCH_DEBOUNCE);
        assert!(waited < SEARCH_DEBOUNCE + Duration::from_millis(5));

        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_each_deliver() {
        let (mut debouncer, mut rx) = Debouncer::new(SEARCH_DEBOUNCE);

        debouncer.push(1);
        assert_eq!(rx.recv().await, Some(1));
        debouncer.push(2);
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (mut debouncer, mut rx) = Debouncer::new(SEARCH_DEBOUNCE);
        debouncer.push("pending");
        assert!(debouncer.is_pending());
        drop(debouncer);

        let outcome = timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(outcome, Ok(None) | Err(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_value() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(50));
        debouncer.push(10);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(timeout(Duration::from_secs(1), rx.recv()).await.is_err());
    }
}
