//! Bounded read executor.
//!
//! Runs read tasks on the tokio runtime, each behind one of `max_threads`
//! permits. The pool can be resized while tasks are queued or running:
//!
//! * growing first cancels outstanding shrink debt, then adds permits;
//! * shrinking retires idle permits immediately and records the rest as
//!   debt, paid off as running tasks release their permits.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

use super::error::DiskError;

#[derive(Debug)]
struct Sizing {
    max_threads: usize,
    /// Permits still to retire once they are released.
    debt: usize,
}

#[derive(Debug)]
struct Inner {
    semaphore: Arc<Semaphore>,
    sizing: Mutex<Sizing>,
}

/// Worker pool for prefetching reads. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReadExecutor {
    inner: Arc<Inner>,
}

impl ReadExecutor {
    /// Create a pool with `max_threads` permits (at least one).
    #[must_use]
    pub fn new(max_threads: usize) -> Self {
        let max_threads = max_threads.max(1);
        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(max_threads)),
                sizing: Mutex::new(Sizing {
                    max_threads,
                    debt: 0,
                }),
            }),
        }
    }

    /// Configured pool size.
    #[must_use]
    pub fn max_threads(&self) -> usize {
        self.inner.sizing.lock().max_threads
    }

    /// Permits free right now.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Resize the pool. Zero is raised to one.
    pub fn set_max_threads(&self, max_threads: usize) {
        let target = max_threads.max(1);
        let mut sizing = self.inner.sizing.lock();
        let current = sizing.max_threads;

        if target > current {
            let grow = target - current;
            let paid = grow.min(sizing.debt);
            sizing.debt -= paid;
            self.inner.semaphore.add_permits(grow - paid);
        } else if target < current {
            let shrink = current - target;
            let retired = self.inner.semaphore.forget_permits(shrink);
            sizing.debt += shrink - retired;
        }

        sizing.max_threads = target;
        debug!(from = current, to = target, debt = sizing.debt, "Resized read executor");
    }

    /// Wait for a free permit.
    ///
    /// # Errors
    ///
    /// Returns `Executor` if the pool has been shut down.
    pub async fn acquire(&self) -> Result<ExecutorPermit, DiskError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| DiskError::Executor(e.to_string()))?;
        Ok(ExecutorPermit {
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
        })
    }

    /// Run `task` on the runtime once a permit is free.
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<Result<T, DiskError>>
    where
        F: Future<Output = Result<T, DiskError>> + Send + 'static,
        T: Send + 'static,
    {
        let executor = self.clone();
        tokio::spawn(async move {
            let _permit = executor.acquire().await?;
            task.await
        })
    }
}

/// Slot held by a running read task.
#[derive(Debug)]
pub struct ExecutorPermit {
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<Inner>,
}

impl Drop for ExecutorPermit {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            let mut sizing = self.inner.sizing.lock();
            if sizing.debt > 0 {
                sizing.debt -= 1;
                permit.forget();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_at_most_max_threads_at_once() {
        let executor = ReadExecutor::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                executor.spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(executor.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_shrink_retires_idle_permits_at_once() {
        let executor = ReadExecutor::new(4);
        executor.set_max_threads(1);

        assert_eq!(executor.max_threads(), 1);
        assert_eq!(executor.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_shrink_while_running_retires_released_permits() {
        let executor = ReadExecutor::new(2);
        let first = executor.acquire().await.unwrap();
        let second = executor.acquire().await.unwrap();

        executor.set_max_threads(1);
        assert_eq!(executor.available_permits(), 0);

        drop(first);
        assert_eq!(executor.available_permits(), 0);
        drop(second);
        assert_eq!(executor.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_grow_releases_queued_task() {
        let executor = ReadExecutor::new(1);
        let held = executor.acquire().await.unwrap();

        let queued = executor.spawn(async { Ok(7) });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!queued.is_finished());

        executor.set_max_threads(2);
        let value = tokio::time::timeout(Duration::from_secs(5), queued)
            .await
            .expect("queued task ran after growing")
            .unwrap()
            .unwrap();
        assert_eq!(value, 7);
        drop(held);
        assert_eq!(executor.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_grow_pays_off_shrink_debt_first() {
        let executor = ReadExecutor::new(2);
        let first = executor.acquire().await.unwrap();
        let second = executor.acquire().await.unwrap();

        executor.set_max_threads(1);
        executor.set_max_threads(3);
        assert_eq!(executor.available_permits(), 1);

        drop(first);
        drop(second);
        assert_eq!(executor.available_permits(), 3);
    }
}
