//! Adapter decorator hiding a fixed number of leading rows.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers, ThreadAffinity};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewKind};
use crate::data::window;
use crate::event::ListEvent;

/// Presents its inner adapter with the first `offset` rows hidden.
///
/// Same arithmetic as the data-level window: events below the boundary are
/// dropped, straddling events are clipped, and size deltas surface at the
/// head.
pub struct OffsetAdapter<A: Adapter> {
    inner: Arc<OffsetNode<A>>,
}

struct OffsetNode<A: Adapter> {
    child: A,
    offset: Mutex<usize>,
    observers: Observers<ListEvent>,
    link: Mutex<Option<ConnectionId>>,
    affinity: ThreadAffinity,
}

impl<A: Adapter> Clone for OffsetAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Adapter> OffsetAdapter<A> {
    /// Wrap `child`, hiding its first `offset` rows.
    pub fn new(child: A, offset: usize) -> Self {
        Self {
            inner: Arc::new(OffsetNode {
                child,
                offset: Mutex::new(offset),
                observers: Observers::new(),
                link: Mutex::new(None),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// The current offset.
    pub fn offset(&self) -> usize {
        *self.inner.offset.lock()
    }

    /// Change the offset, surfacing the row delta at position 0.
    pub fn set_offset(&self, offset: usize) {
        self.inner.affinity.debug_assert_owner();
        let events = {
            let mut current = self.inner.offset.lock();
            let old = *current;
            if old == offset {
                return;
            }
            *current = offset;
            window::offset_update_events(old, offset, self.inner.child.count())
        };
        for event in events {
            self.inner.observers.emit(&event);
        }
    }

    fn route(&self, position: usize) -> usize {
        let count = self.count();
        assert!(
            position < count,
            "position {position} out of bounds (count {count})"
        );
        position + self.offset()
    }
}

impl<A: Adapter> OffsetNode<A> {
    fn on_child_rows(&self, event: &ListEvent) {
        let events = {
            let offset = *self.offset.lock();
            window::offset_events(offset, self.child.count(), event)
        };
        for event in events {
            if !event.is_empty_range() {
                self.observers.emit(&event);
            }
        }
    }
}

impl<A: Adapter> Adapter for OffsetAdapter<A> {
    fn count(&self) -> usize {
        self.inner.child.count().saturating_sub(self.offset())
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        self.inner.child.view_kind(self.route(position))
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        self.inner.child.try_create_view(kind)
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        self.inner.child.bind_view(self.route(position), view)
    }

    fn is_interactive(&self, position: usize) -> bool {
        self.inner.child.is_interactive(self.route(position))
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        self.inner.child.stable_id(self.route(position))
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        let first = self.inner.observers.is_empty();
        let id = self.inner.observers.connect(move |event| slot(event));
        if first {
            let weak: Weak<OffsetNode<A>> = Arc::downgrade(&self.inner);
            *self.inner.link.lock() = Some(self.inner.child.connect_rows(Box::new(move |event| {
                if let Some(node) = weak.upgrade() {
                    node.on_child_rows(event);
                }
            })));
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
        if self.inner.observers.is_empty() {
            if let Some(link) = self.inner.link.lock().take() {
                self.inner.child.disconnect_rows(link);
            }
        }
    }
}
