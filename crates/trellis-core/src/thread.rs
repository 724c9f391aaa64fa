//! Thread affinity tracking for single-owner objects.
//!
//! Trellis nodes are owned by the thread that created them: reads, mutations,
//! and connection management all happen on that owner thread, while
//! background work communicates results through an
//! [`OwnerQueue`](crate::OwnerQueue). This module provides the tracker used
//! to verify that discipline in debug builds.
//!
//! # Usage
//!
//! ```
//! use trellis_core::ThreadAffinity;
//!
//! struct Counter {
//!     affinity: ThreadAffinity,
//!     value: std::cell::Cell<i32>,
//! }
//!
//! impl Counter {
//!     fn new() -> Self {
//!         Self {
//!             affinity: ThreadAffinity::current(),
//!             value: std::cell::Cell::new(0),
//!         }
//!     }
//!
//!     fn increment(&self) {
//!         // In debug builds, panic if called from the wrong thread.
//!         self.affinity.debug_assert_owner();
//!         self.value.set(self.value.get() + 1);
//!     }
//! }
//! ```

use std::thread::ThreadId;

/// Records the owning thread of an object at construction time.
///
/// Check methods compare the current thread against the recorded owner.
/// `debug_assert_owner` is a no-op in release builds, so owner checks can be
/// placed liberally at mutating entry points.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Create an affinity tracker bound to the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// Get the thread ID this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Check if the current thread is the owner.
    #[inline]
    pub fn is_owner(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Assert that the current thread is the owner.
    ///
    /// This always runs (debug and release builds).
    ///
    /// # Panics
    ///
    /// Panics with a descriptive message if called from a different thread.
    #[inline]
    pub fn assert_owner(&self) {
        self.assert_owner_with_msg("object accessed from a thread that does not own it")
    }

    /// Assert that the current thread is the owner, with a custom message.
    ///
    /// # Panics
    ///
    /// Panics if called from a different thread.
    pub fn assert_owner_with_msg(&self, msg: &str) {
        if !self.is_owner() {
            self.panic_wrong_thread(msg);
        }
    }

    /// Debug-only assertion that the current thread is the owner.
    ///
    /// This is a no-op in release builds.
    #[inline]
    pub fn debug_assert_owner(&self) {
        #[cfg(debug_assertions)]
        self.assert_owner();
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, msg: &str) -> ! {
        let current = std::thread::current();
        let current_name = current.name().unwrap_or("<unnamed>");
        let current_id = current.id();

        panic!(
            "\n\
            ══════════════════════════════════════════════════════════════════════\n\
            THREAD AFFINITY VIOLATION\n\
            ══════════════════════════════════════════════════════════════════════\n\
            \n\
            {msg}\n\
            \n\
            Object is owned by thread: {:?}\n\
            Current thread: \"{current_name}\" (ID: {current_id:?})\n\
            \n\
            Trellis objects are single-owner: reads, mutations, and observer\n\
            management must happen on the thread that created the object.\n\
            \n\
            POSSIBLE SOLUTIONS:\n\
            \n\
            1. Post the operation to the owner thread's queue:\n\
               queue.post(move || source.refresh());\n\
            \n\
            2. Run background work on an executor and deliver only the result\n\
               through the owner queue, never the mutation itself.\n\
            \n\
            ══════════════════════════════════════════════════════════════════════",
            self.thread_id
        )
    }
}
