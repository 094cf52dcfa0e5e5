//! Bounded worker pool.
//!
//! Every dispatched update runs as its own tokio task. A semaphore with
//! `max_concurrency` permits gates admission: [`WorkerPool::submit`] waits
//! for a free permit, spawns the task holding it, and returns without waiting
//! for the task to finish. The permit is released when the task ends, whether
//! it returned normally, returned an error or panicked.

use std::any::Any;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::foundation::{DispatchError, DispatchResult};

/// Default maximum number of concurrently running handlers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs submitted tasks with at most `max_concurrency` in flight.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

impl WorkerPool {
    /// Creates a pool admitting at most `max_concurrency` concurrent tasks.
    pub fn new(max_concurrency: NonZeroUsize) -> Self {
        let max_concurrency = max_concurrency.get().min(Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// The concurrency cap.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Number of tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.max_concurrency
            .saturating_sub(self.permits.available_permits())
    }

    /// Whether admission has been closed.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Admits `task` once a slot is free and starts it.
    ///
    /// Suspends while the pool is saturated. Returns as soon as the task is
    /// spawned.
    pub async fn submit<F>(&self, task: F) -> DispatchResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::Closed)?;

        let handle = Handle::try_current().map_err(|e| DispatchError::Spawn(e.to_string()))?;

        handle.spawn(async move {
            let _permit = permit;
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                error!("Handler panicked: {}", panic_message(panic.as_ref()));
            }
        });

        Ok(())
    }

    /// Stops admitting new tasks. Pending and future `submit` calls fail with
    /// [`DispatchError::Closed`]; running tasks are unaffected.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Closes admission and waits for running tasks to finish.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn drain(&self, timeout: Option<Duration>) -> bool {
        self.close();

        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            let in_flight = self.in_flight();
            if in_flight == 0 {
                debug!("All handlers completed");
                return true;
            }

            if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                warn!(remaining = in_flight, "Shutdown timeout reached");
                return false;
            }

            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_MAX_CONCURRENCY).unwrap_or(NonZeroUsize::MIN))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready_ok, task};

    fn pool(n: usize) -> WorkerPool {
        WorkerPool::new(NonZeroUsize::new(n).unwrap())
    }

    #[tokio::test]
    async fn test_fourth_submit_waits_for_a_slot() {
        let pool = pool(3);
        let gate = Arc::new(Notify::new());

        for _ in 0..3 {
            let gate = gate.clone();
            pool.submit(async move { gate.notified().await }).await.unwrap();
        }
        assert_eq!(pool.in_flight(), 3);

        let mut fourth = task::spawn(pool.submit(async {}));
        assert_pending!(fourth.poll());

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !fourth.is_woken() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_ready_ok!(fourth.poll());

        gate.notify_waiters();
        assert!(pool.drain(Some(Duration::from_secs(1))).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_cap() {
        let pool = pool(3);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let current = current.clone();
            let peak = peak.clone();
            pool.submit(async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        assert!(pool.drain(Some(Duration::from_secs(5))).await);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak}");
        assert!(peak >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_slot_runs_in_submission_order() {
        let pool = pool(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            pool.submit(async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                order.lock().push(i);
            })
            .await
            .unwrap();
        }

        assert!(pool.drain(Some(Duration::from_secs(5))).await);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panicking_task_releases_its_slot() {
        let pool = pool(1);
        pool.submit(async { panic!("handler exploded") }).await.unwrap();

        let done = Arc::new(AtomicUsize::new(0));
        let counter = done.clone();
        pool.submit(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert!(pool.drain(Some(Duration::from_secs(1))).await);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_submissions() {
        let pool = pool(2);
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(
            pool.submit(async {}).await,
            Err(DispatchError::Closed)
        ));
    }

    #[test]
    fn test_submit_without_runtime_fails() {
        let pool = pool(1);
        let result = futures::executor::block_on(pool.submit(async {}));
        assert!(matches!(result, Err(DispatchError::Spawn(_))));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_times_out_on_stuck_task() {
        let pool = pool(1);
        pool.submit(std::future::pending()).await.unwrap();
        assert!(!pool.drain(Some(Duration::from_millis(30))).await);
        assert_eq!(pool.in_flight(), 1);
    }
}
