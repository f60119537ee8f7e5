//! Debouncer for free-text input
//!
//! Each [`Debouncer::push`] aborts the pending timer and starts a new one.
//! A value reaches the receiver only once it has gone a full quiet interval
//! without being replaced.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet interval for restaurant search input
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Delays values until input pauses
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver settled values arrive on
    pub fn new(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            quiet,
            tx,
            pending: None,
        };
        (debouncer, rx)
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Replace any pending value with `value` and restart the timer.
    /// Must be called from within a tokio runtime.
    pub fn push(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // Receiver gone means nobody is listening any more
            let _ = tx.send(value);
        }));
    }

    /// Drop the pending value, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

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
    use tokio::time::{sleep, timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_only_final_value_propagates() {
        let (mut debouncer, mut rx) = Debouncer::new(SEARCH_DEBOUNCE);
        let start = Instant::now();

        debouncer.push("p".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.push("pi".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.push("piz".to_string());

        sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err(), "nothing may propagate before 700ms");

        let value = rx.recv().await.unwrap();
        assert_eq!(value, "piz");
        assert!(start.elapsed() >= Duration::from_millis(700));

        let extra = timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(extra.is_err(), "exactly one propagation expected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_values_all_propagate() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(50));
        debouncer.push(1);
        sleep(Duration::from_millis(60)).await;
        debouncer.push(2);
        sleep(Duration::from_millis(60)).await;

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let (mut debouncer, mut rx) = Debouncer::new(SEARCH_DEBOUNCE);
        debouncer.push("abc");
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        let got = timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(got.is_err());
    }
}
