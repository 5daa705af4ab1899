//! Fixed-interval polling, the fallback for dropped or coalesced change
//! notifications.
//!
//! Each poller is owned by the view scope that created it and dies with it:
//! dropping the handle aborts the task, so a torn-down conversation screen
//! can never keep refreshing a stale scope in the background.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to one background polling task. Aborts the task on drop.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Spawn a poller that awaits `tick()` every `period`.
    ///
    /// The first tick fires after one full period, not immediately - callers
    /// do their own initial fetch, the poller only keeps it fresh. Tick
    /// errors are logged and swallowed; the next tick retries from scratch.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval's first tick completes immediately; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(err) = tick().await {
                    tracing::warn!(poller = name, error = %err, "poll tick failed");
                }
            }
        });
        Self { task }
    }

    /// Stop polling now instead of waiting for the handle to drop.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_fixed_interval_and_survives_errors() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_in_task = count.clone();
        let _handle = PollHandle::spawn("test", Duration::from_secs(4), move || {
            let count = count_in_task.clone();
            async move {
                let n = count.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    anyhow::bail!("first tick fails");
                }
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // The failed tick did not kill the task.
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_task_without_dropping_the_handle() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_in_task = count.clone();
        let handle = PollHandle::spawn("test", Duration::from_secs(1), move || {
            let count = count_in_task.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_in_task = count.clone();
        let handle = PollHandle::spawn("test", Duration::from_secs(1), move || {
            let count = count_in_task.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(2100)).await;
        let seen = count.load(Ordering::SeqCst);
        drop(handle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
