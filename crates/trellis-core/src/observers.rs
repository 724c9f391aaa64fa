//! Observer registry for Trellis.
//!
//! This module provides the registry that backs every notification channel in
//! the library. A node owns one [`Observers`] per channel, hands out a
//! [`ConnectionId`] for each connected slot (callback), and notifies every
//! slot when it emits.
//!
//! # Key Types
//!
//! - [`Observers<E>`] - A registry of slots receiving `&E` notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//!
//! # Dispatch
//!
//! Emission is synchronous: every slot runs on the emitting thread before
//! [`Observers::emit`] returns, in the order slots were connected. The
//! registry lock is not held while slots run, so a slot may connect or
//! disconnect observers on the same registry re-entrantly. A slot
//! disconnected during an emission still receives the in-flight event.
//!
//! # Example
//!
//! ```
//! use trellis_core::Observers;
//!
//! let observers = Observers::<i32>::new();
//!
//! let id = observers.connect(|value| {
//!     println!("notified: {value}");
//! });
//!
//! observers.emit(&42);
//! observers.disconnect(id);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// A unique identifier for a connected observer slot.
    ///
    /// Use this ID to disconnect a specific slot via [`Observers::disconnect`].
    /// IDs are never reused for the lifetime of the registry.
    pub struct ConnectionId;
}

/// Internal registry state.
struct Registry<E> {
    /// All active slots, keyed by connection.
    slots: SlotMap<ConnectionId, Arc<dyn Fn(&E) + Send + Sync>>,
    /// Connection order, for deterministic dispatch.
    order: Vec<ConnectionId>,
}

/// A registry of observer slots notified with `&E`.
///
/// Connecting the first slot and disconnecting the last one are the
/// transitions nodes use to activate and deactivate upstream resources;
/// [`Observers::count`] reports the current number of connections.
///
/// # Type Parameter
///
/// - `E`: The notification payload. Slots receive it by reference, so no
///   `Clone` bound is required.
pub struct Observers<E> {
    registry: Mutex<Registry<E>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Observers<E> {
    /// Create a new registry with no connections.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                slots: SlotMap::with_key(),
                order: Vec::new(),
            }),
        }
    }

    /// Connect a slot (closure) to this registry.
    ///
    /// Returns a [`ConnectionId`] that must be used to disconnect the slot
    /// later. Slots are dispatched in connection order.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_core::Observers;
    ///
    /// let observers = Observers::<String>::new();
    /// let id = observers.connect(|s| println!("got: {s}"));
    /// observers.emit(&"hello".to_string());
    /// observers.disconnect(id);
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.slots.insert(Arc::new(slot));
        registry.order.push(id);
        id
    }

    /// Disconnect a slot by its connection ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not currently connected. Disconnecting the same
    /// ID twice is a bug in the caller, not a recoverable condition.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut registry = self.registry.lock();
        if registry.slots.remove(id).is_none() {
            panic!("attempted to disconnect an observer that is not connected");
        }
        registry.order.retain(|&entry| entry != id);
    }

    /// Get the number of connected slots.
    pub fn count(&self) -> usize {
        self.registry.lock().slots.len()
    }

    /// Check whether no slots are connected.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Emit a notification, invoking every connected slot in connection order.
    ///
    /// The registry lock is released before slots run, so slots may
    /// re-entrantly connect or disconnect on this registry.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Arc<dyn Fn(&E) + Send + Sync>> = {
            let registry = self.registry.lock();
            registry
                .order
                .iter()
                .filter_map(|&id| registry.slots.get(id).cloned())
                .collect()
        };
        tracing::trace!(
            target: "trellis_core::observers",
            observer_count = snapshot.len(),
            "dispatching notification"
        );
        for slot in snapshot {
            slot(event);
        }
    }
}

// The payload only appears behind `dyn Fn(&E) + Send + Sync`, so the registry
// is shareable regardless of E.
static_assertions::assert_impl_all!(Observers<*const ()>: Send, Sync);
