//! Background execution for Trellis.
//!
//! Sources that load content asynchronously never spawn threads on their own
//! behalf for one-shot work; they run it on an [`Executor`] passed in at
//! construction time. Two implementations are provided:
//!
//! - [`InlineExecutor`] runs tasks immediately on the calling thread. Useful
//!   for tests and for embedders that already marshal work themselves.
//! - [`ThreadPoolExecutor`] runs tasks on a rayon work-stealing pool.
//!
//! A lazily-initialized shared pool is available through [`shared`], with
//! [`init_shared`] as the explicit-configuration override.
//!
//! Background tasks receive no direct access to the object that spawned
//! them. They communicate results by posting closures to the owner's
//! [`OwnerQueue`](crate::OwnerQueue) and check a [`CancellationToken`] to
//! stop early when the object has moved on.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Executor, InlineExecutor};
//!
//! let executor = InlineExecutor;
//! executor.execute(Box::new(|| {
//!     println!("ran inline");
//! }));
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::error::{ExecutorError, Result};

/// Shared executor instance.
static SHARED_EXECUTOR: OnceLock<Arc<ThreadPoolExecutor>> = OnceLock::new();

/// A cancellation token for cooperative task cancellation.
///
/// Tokens signal that a task's result is no longer wanted. Tasks must
/// periodically check the token and exit quietly when cancelled; there is no
/// preemption.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::Release) {
            tracing::trace!(target: "trellis_core::executor", "cancellation requested");
        }
    }

    /// Reset the token to the non-cancelled state.
    ///
    /// This allows reusing a token for multiple operations.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs boxed tasks in the background.
///
/// Implementations must tolerate tasks that panic only insofar as the
/// embedder's panic policy allows; the library itself never unwinds across
/// an executor boundary.
pub trait Executor: Send + Sync {
    /// Run a task. `execute` must not block on the task's completion.
    fn execute(&self, task: Box<dyn FnOnce() + Send>);
}

/// An executor that runs every task immediately on the calling thread.
///
/// `execute` returns only after the task has run, which makes asynchronous
/// sources fully deterministic. Intended for tests and for embedders with
/// their own scheduling.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Configuration for creating a [`ThreadPoolExecutor`].
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `None` means use the number of CPU cores.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "trellis-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with a custom thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }
}

/// An executor backed by a rayon work-stealing thread pool.
#[derive(Debug)]
pub struct ThreadPoolExecutor {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl ThreadPoolExecutor {
    /// Create a new pool executor with the given configuration.
    pub fn new(config: ThreadPoolConfig) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(move |index| format!("{}-{}", config.thread_name, index));

        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| ExecutorError::CreationFailed(e.to_string()))?;

        tracing::debug!(
            target: "trellis_core::executor",
            num_threads = pool.current_num_threads(),
            "thread pool created"
        );

        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Get the number of threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get the number of currently running tasks.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        let active = self.active_tasks.clone();
        active.fetch_add(1, Ordering::AcqRel);
        self.pool.spawn(move || {
            task();
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}

/// Get the shared pool executor, initializing it with default settings on
/// first use.
pub fn shared() -> Arc<ThreadPoolExecutor> {
    SHARED_EXECUTOR
        .get_or_init(|| {
            Arc::new(
                ThreadPoolExecutor::new(ThreadPoolConfig::default())
                    .expect("Failed to create shared thread pool"),
            )
        })
        .clone()
}

/// Initialize the shared pool executor with custom configuration.
///
/// Must be called before the first use of [`shared`]. Returns an error if
/// the shared executor has already been initialized.
pub fn init_shared(config: ThreadPoolConfig) -> Result<Arc<ThreadPoolExecutor>> {
    let executor = Arc::new(ThreadPoolExecutor::new(config)?);
    SHARED_EXECUTOR
        .set(executor.clone())
        .map_err(|_| ExecutorError::AlreadyInitialized)?;
    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::time::Duration;

    #[test]
    fn test_inline_executor_runs_immediately() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let caller = std::thread::current().id();
        let task_thread = Arc::new(parking_lot::Mutex::new(None));
        let task_thread_clone = task_thread.clone();

        InlineExecutor.execute(Box::new(move || {
            ran_clone.store(true, Ordering::SeqCst);
            *task_thread_clone.lock() = Some(std::thread::current().id());
        }));

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(*task_thread.lock(), Some(caller));
    }

    #[test]
    fn test_pool_executor_runs_tasks() {
        let executor = ThreadPoolExecutor::new(ThreadPoolConfig::with_threads(2)).unwrap();
        let counter = Arc::new(AtomicI32::new(0));
        let (tx, rx) = crossbeam_channel::bounded(8);

        for _ in 0..8 {
            let counter_clone = counter.clone();
            let tx_clone = tx.clone();
            executor.execute(Box::new(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                tx_clone.send(()).unwrap();
            }));
        }

        for _ in 0..8 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_pool_thread_name() {
        let config = ThreadPoolConfig {
            num_threads: Some(1),
            thread_name: "naming-test".to_string(),
            stack_size: None,
        };
        let executor = ThreadPoolExecutor::new(config).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);

        executor.execute(Box::new(move || {
            let name = std::thread::current().name().map(String::from);
            tx.send(name).unwrap();
        }));

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("naming-test-0"));
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        let shared = token.clone();
        token.cancel();
        assert!(shared.is_cancelled());

        token.reset();
        assert!(!shared.is_cancelled());
    }

    #[test]
    fn test_shared_initializes_once() {
        // First use initializes with defaults; explicit init afterwards must
        // report the conflict.
        let executor = shared();
        assert!(executor.num_threads() > 0);

        let result = init_shared(ThreadPoolConfig::with_threads(1));
        assert_eq!(result.unwrap_err(), ExecutorError::AlreadyInitialized);
    }
}
