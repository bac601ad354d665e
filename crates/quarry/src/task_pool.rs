//! Async task execution pool.
//!
//! Background work spawned by the asset loader runs here, separate from the
//! resource managers' worker threads.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Poll, Waker};
use std::thread;

use async_executor::{Executor, Task};
use parking_lot::Mutex;

/// One-shot stop signal that pool threads await alongside the executor.
#[derive(Default)]
struct StopSignal {
    stopped: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
}

impl StopSignal {
    fn trigger(&self) {
        self.stopped.store(true, Ordering::Release);
        for waker in self.wakers.lock().drain(..) {
            waker.wake();
        }
    }

    fn is_triggered(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        futures_lite::future::poll_fn(|cx| {
            if self.is_triggered() {
                return Poll::Ready(());
            }
            self.wakers.lock().push(cx.waker().clone());
            // Re-check after registering so a concurrent trigger is not missed.
            if self.is_triggered() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

/// A thread pool for executing async tasks.
///
/// Each thread drives the shared executor until the pool is shut down. Tasks
/// still queued at shutdown are dropped without running.
///
/// # Example
///
/// ```ignore
/// use quarry::TaskPool;
///
/// let pool = TaskPool::new(4);
/// let task = pool.spawn(async { 42 });
///
/// let result = pollster::block_on(task);
/// assert_eq!(result, 42);
/// ```
pub struct TaskPool {
    executor: Arc<Executor<'static>>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    stop: Arc<StopSignal>,
}

impl TaskPool {
    /// Create a pool with `num_threads` threads (at least one).
    pub fn new(num_threads: usize) -> Self {
        let num_threads = if num_threads == 0 {
            tracing::warn!("TaskPool requested with zero threads, using one");
            1
        } else {
            num_threads
        };

        let executor = Arc::new(Executor::new());
        let stop = Arc::new(StopSignal::default());
        let mut threads = Vec::with_capacity(num_threads);

        for i in 0..num_threads {
            let exec = Arc::clone(&executor);
            let stop = Arc::clone(&stop);
            let spawned = thread::Builder::new()
                .name(format!("quarry-task-{}", i))
                .spawn(move || futures_lite::future::block_on(exec.run(stop.wait())));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(err) => tracing::error!("Failed to spawn task pool thread {}: {}", i, err),
            }
        }

        tracing::debug!("TaskPool created with {} threads", threads.len());

        Self {
            executor,
            threads: Mutex::new(threads),
            stop,
        }
    }

    /// Create a task pool using the number of available CPU cores.
    pub fn with_num_cpus() -> Self {
        Self::new(num_cpus::get())
    }

    /// Create a task pool with `max(1, num_cpus - 1)` threads.
    pub fn default_threads() -> Self {
        Self::new(default_thread_count())
    }

    /// Spawn an async task on the pool.
    ///
    /// Dropping the returned `Task` cancels it; call [`Task::detach`] to let
    /// it run to completion unobserved.
    pub fn spawn<T>(&self, future: impl Future<Output = T> + Send + 'static) -> Task<T>
    where
        T: Send + 'static,
    {
        if self.is_shut_down() {
            tracing::warn!("Task spawned on a TaskPool that is shut down; it will never run");
        }
        self.executor.spawn(future)
    }

    /// Number of live pool threads.
    pub fn thread_count(&self) -> usize {
        self.threads.lock().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.stop.is_triggered()
    }

    /// Stop the pool and wait for its threads to finish.
    ///
    /// Tasks currently being polled complete their poll; queued tasks do not
    /// run. Idempotent.
    pub fn shutdown(&self) {
        let threads = std::mem::take(&mut *self.threads.lock());
        if threads.is_empty() {
            self.stop.trigger();
            return;
        }

        tracing::debug!("Shutting down TaskPool with {} threads", threads.len());
        self.stop.trigger();
        for handle in threads {
            if let Err(e) = handle.join() {
                tracing::error!("Task pool thread panicked: {:?}", e);
            }
        }
        tracing::debug!("TaskPool shutdown complete");
    }
}

/// Default pool size, leaving one core for the calling thread.
pub fn default_thread_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
