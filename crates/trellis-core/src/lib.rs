//! Core plumbing for Trellis.
//!
//! This crate provides the foundational components of the Trellis reactive
//! list library, none of which know anything about lists:
//!
//! - **Observer Registry**: Slot registration and ordered synchronous dispatch
//! - **Thread Affinity**: Debug-mode enforcement of single-owner access
//! - **Executors**: Inline and rayon-backed background execution
//! - **Cancellation**: Cooperative tokens checked by background tasks
//! - **Owner Queue**: Cross-thread result marshaling with coalesced wakeups
//!
//! # Observer Example
//!
//! ```
//! use trellis_core::Observers;
//!
//! let changed = Observers::<i32>::new();
//!
//! // Connect a slot to handle notifications
//! let conn_id = changed.connect(|value| {
//!     println!("changed to: {value}");
//! });
//!
//! // Notify
//! changed.emit(&42);
//!
//! // Disconnect when done
//! changed.disconnect(conn_id);
//! ```
//!
//! # Owner Queue Example
//!
//! ```
//! use trellis_core::OwnerQueue;
//!
//! let queue = OwnerQueue::new();
//!
//! // A background thread posts a result closure
//! let handle = queue.clone();
//! std::thread::spawn(move || {
//!     handle.post(Box::new(|| println!("result applied")));
//! })
//! .join()
//! .unwrap();
//!
//! // The owner thread drains at a convenient point
//! queue.drain();
//! ```

mod error;
mod executor;
mod observers;
mod queue;
mod thread;

pub use error::{ExecutorError, Result};
pub use executor::{
    init_shared, shared, CancellationToken, Executor, InlineExecutor, ThreadPoolConfig,
    ThreadPoolExecutor,
};
pub use observers::{ConnectionId, Observers};
pub use queue::OwnerQueue;
pub use thread::ThreadAffinity;
