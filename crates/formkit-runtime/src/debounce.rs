//! Restartable one-shot timer
//!
//! `schedule` (re)arms the timer; when it elapses without being re-armed the
//! action runs once. Cancelling or dropping the debouncer disarms it. Once
//! the timer has fired, the action runs as its own task, so re-arming never
//! interrupts an action that already started.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Trailing-edge debouncer
pub struct Debouncer {
    delay: Duration,
    action: Action,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a disarmed debouncer
    pub fn new<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            action: Arc::new(move || Box::pin(action())),
            timer: Mutex::new(None),
        }
    }

    /// Quiet period before the action runs
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer, restarting it if already armed
    ///
    /// Outside a tokio runtime nothing is armed and `false` is returned.
    pub fn schedule(&self) -> bool {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("debounce requested outside an async runtime; skipped");
            return false;
        };

        let action = Arc::clone(&self.action);
        let delay = self.delay;
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        *timer = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action());
        }));
        true
    }

    /// Disarm the timer; an action already running is left alone
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }

    /// Whether the timer is armed and has not fired yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(delay_ms: u64) -> (Debouncer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move || {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        (debouncer, count)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_period() {
        let (debouncer, count) = counting(1000);
        assert!(debouncer.schedule());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(999)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_timer() {
        let (debouncer, count) = counting(1000);
        for _ in 0..5 {
            debouncer.schedule();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_disarm() {
        let (debouncer, count) = counting(100);
        debouncer.schedule();
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        let (dropped, dropped_count) = counting(100);
        dropped.schedule();
        drop(dropped);

        tokio::time::sleep(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(dropped_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn schedule_without_runtime_is_skipped() {
        let (debouncer, _count) = counting(100);
        assert!(!debouncer.schedule());
        assert!(!debouncer.is_pending());
    }
}
