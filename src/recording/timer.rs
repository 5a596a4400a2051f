//! Auto-stop timer owned by a recording session

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A single scheduled callback that ends a recording after a ceiling.
///
/// Dropping an armed timer cancels it, so a session that goes away can never
/// leave a callback behind.
#[derive(Debug)]
pub struct AutoStopTimer {
    handle: Option<JoinHandle<()>>,
    deadline: Instant,
}

impl AutoStopTimer {
    /// Run `on_fire` once `after` has elapsed
    pub fn arm<F>(after: Duration, on_fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + after;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            on_fire.await;
        });
        Self {
            handle: Some(handle),
            deadline,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Abort the pending callback
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Let go of the handle without aborting. Used from inside the firing
    /// callback, which must not abort itself mid-stop.
    pub fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for AutoStopTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_deadline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = AutoStopTimer::arm(Duration::from_secs(30), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = AutoStopTimer::arm(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        drop(AutoStopTimer::arm(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
