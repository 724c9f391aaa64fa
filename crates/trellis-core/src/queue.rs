//! Owner-thread task queue with coalesced wakeups.
//!
//! Background work must never mutate a single-owner object directly. Instead
//! it posts a closure to the object's [`OwnerQueue`]; the owner thread drains
//! the queue at a convenient point (typically from its event loop) and runs
//! every closure in posting order.
//!
//! # How It Works
//!
//! 1. Any thread calls [`OwnerQueue::post`] with a result-applying closure.
//!
//! 2. The first post after an idle period fires the wake hook exactly once.
//!    Further posts before the next drain are coalesced into that single
//!    wakeup, so a burst of results costs one event-loop turn.
//!
//! 3. The owner thread calls [`OwnerQueue::drain`], which runs all queued
//!    closures, including ones posted while draining.
//!
//! # Example
//!
//! ```
//! use trellis_core::OwnerQueue;
//!
//! let queue = OwnerQueue::new();
//! queue.post(Box::new(|| println!("applied on the owner thread")));
//! let ran = queue.drain();
//! assert_eq!(ran, 1);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::thread::ThreadAffinity;

/// A closure queued for execution on the owner thread.
type QueuedTask = Box<dyn FnOnce() + Send>;

struct QueueInner {
    /// The thread that owns this queue and is allowed to drain it.
    affinity: ThreadAffinity,
    sender: Sender<QueuedTask>,
    /// Locked only by `drain`; posts go through `sender`.
    receiver: Mutex<Receiver<QueuedTask>>,
    /// Whether a wakeup has been fired since the last drain.
    posted: AtomicBool,
    wake_hook: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

/// A cross-thread FIFO of closures drained on its owner thread.
///
/// The queue is a cheap-clone handle; clones share the same underlying
/// queue. [`post`](Self::post) may be called from any thread,
/// [`drain`](Self::drain) only from the thread that created the queue.
#[derive(Clone)]
pub struct OwnerQueue {
    inner: Arc<QueueInner>,
}

impl Default for OwnerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerQueue {
    /// Create a queue owned by the current thread.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            inner: Arc::new(QueueInner {
                affinity: ThreadAffinity::current(),
                sender,
                receiver: Mutex::new(receiver),
                posted: AtomicBool::new(false),
                wake_hook: Mutex::new(None),
            }),
        }
    }

    /// Install the hook fired on the first post after an idle period.
    ///
    /// Embedders typically use this to schedule a drain on their event loop.
    /// The hook may be invoked from any thread.
    pub fn set_wake_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.wake_hook.lock() = Some(Arc::new(hook));
    }

    /// Queue a closure for execution on the owner thread.
    ///
    /// May be called from any thread. Fires the wake hook if this is the
    /// first post since the last drain.
    pub fn post(&self, task: QueuedTask) {
        // The receiver lives inside the same inner, so the channel can
        // never be disconnected while this handle exists.
        let _ = self.inner.sender.send(task);
        if !self.inner.posted.swap(true, Ordering::SeqCst) {
            let hook = self.inner.wake_hook.lock().clone();
            if let Some(hook) = hook {
                tracing::trace!(target: "trellis_core::queue", "waking owner");
                hook();
            }
        }
    }

    /// Number of closures currently queued.
    pub fn pending(&self) -> usize {
        self.inner.sender.len()
    }

    /// Run every queued closure on the owner thread, in posting order.
    ///
    /// Closures posted while draining are picked up by the same drain.
    /// Returns the number of closures run. A re-entrant drain (from inside
    /// a queued closure) returns 0 and leaves the work to the outer drain.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if called from a thread other than the owner.
    pub fn drain(&self) -> usize {
        self.inner.affinity.debug_assert_owner();
        let Some(receiver) = self.inner.receiver.try_lock() else {
            return 0;
        };

        let mut ran = 0;
        loop {
            // Clear the coalescing flag before taking the batch so a post
            // racing with the final empty check still fires a wakeup.
            self.inner.posted.store(false, Ordering::SeqCst);
            let batch: Vec<QueuedTask> = receiver.try_iter().collect();
            if batch.is_empty() {
                break;
            }
            for task in batch {
                task();
                ran += 1;
            }
        }

        if ran > 0 {
            tracing::trace!(target: "trellis_core::queue", tasks = ran, "drained owner queue");
        }
        ran
    }
}

static_assertions::assert_impl_all!(OwnerQueue: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_post_and_drain_in_order() {
        let queue = OwnerQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log_clone = log.clone();
            queue.post(Box::new(move || log_clone.lock().push(i)));
        }

        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.drain(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_wake_fires_once_per_burst() {
        let queue = OwnerQueue::new();
        let wakes = Arc::new(AtomicUsize::new(0));

        let wakes_clone = wakes.clone();
        queue.set_wake_hook(move || {
            wakes_clone.fetch_add(1, Ordering::SeqCst);
        });

        queue.post(Box::new(|| {}));
        queue.post(Box::new(|| {}));
        queue.post(Box::new(|| {}));
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        queue.drain();
        queue.post(Box::new(|| {}));
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_post_from_other_thread() {
        let queue = OwnerQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let queue_clone = queue.clone();
        let ran_clone = ran.clone();
        std::thread::spawn(move || {
            queue_clone.post(Box::new(move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            }));
        })
        .join()
        .unwrap();

        assert_eq!(queue.drain(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drain_picks_up_tasks_posted_while_draining() {
        let queue = OwnerQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let queue_clone = queue.clone();
        let log_clone = log.clone();
        queue.post(Box::new(move || {
            log_clone.lock().push("first");
            let log_inner = log_clone.clone();
            queue_clone.post(Box::new(move || log_inner.lock().push("second")));
        }));

        assert_eq!(queue.drain(), 2);
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_reentrant_drain_is_a_no_op() {
        let queue = OwnerQueue::new();
        let inner_result = Arc::new(Mutex::new(None));

        let queue_clone = queue.clone();
        let inner_result_clone = inner_result.clone();
        queue.post(Box::new(move || {
            *inner_result_clone.lock() = Some(queue_clone.drain());
        }));

        assert_eq!(queue.drain(), 1);
        assert_eq!(*inner_result.lock(), Some(0));
    }

    #[test]
    fn test_drain_from_wrong_thread_panics() {
        let queue = OwnerQueue::new();

        let queue_clone = queue.clone();
        let result = std::thread::spawn(move || {
            queue_clone.drain();
        })
        .join();

        assert!(result.is_err(), "Expected drain to panic off the owner thread");
    }
}
