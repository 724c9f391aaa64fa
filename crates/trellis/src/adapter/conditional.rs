//! Gating an adapter behind a condition.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::{Adapter, AdapterSlot, Condition, ViewHandle, ViewKind};
use crate::event::ListEvent;

/// Shows its child only while a [`Condition`] holds.
///
/// While visible the child passes through unmapped; while hidden the adapter
/// has zero rows and ignores the child entirely. Visibility transitions emit
/// a removal or insertion of the whole child range. The child is observed
/// only while the adapter is observed *and* visible, and the condition only
/// while the adapter is observed.
pub struct ConditionalAdapter<A: Adapter> {
    inner: Arc<ConditionalNode<A>>,
}

struct ConditionalNode<A: Adapter> {
    child: A,
    condition: Condition,
    observers: Observers<ListEvent>,
    active: Mutex<Option<Active>>,
}

struct Active {
    condition_link: ConnectionId,
    child_link: Option<ConnectionId>,
    visible: bool,
}

impl<A: Adapter> Clone for ConditionalAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Adapter> ConditionalAdapter<A> {
    /// Show `child` only while `condition` holds.
    pub fn new(child: A, condition: Condition) -> Self {
        Self {
            inner: Arc::new(ConditionalNode {
                child,
                condition,
                observers: Observers::new(),
                active: Mutex::new(None),
            }),
        }
    }

    fn visible(&self) -> bool {
        match self.inner.active.lock().as_ref() {
            Some(active) => active.visible,
            // Dormant: nothing tracks the condition, so evaluate fresh.
            None => self.inner.condition.eval(),
        }
    }

    fn route(&self, position: usize) -> usize {
        let count = self.count();
        assert!(
            position < count,
            "position {position} out of bounds (count {count})"
        );
        position
    }
}

impl<A: Adapter> ConditionalNode<A> {
    fn connect_child(self: &Arc<Self>) -> ConnectionId {
        let weak: Weak<ConditionalNode<A>> = Arc::downgrade(self);
        self.child.connect_rows(Box::new(move |event| {
            if let Some(node) = weak.upgrade() {
                node.observers.emit(event);
            }
        }))
    }

    fn on_condition(self: &Arc<Self>, visible: bool) {
        let event = {
            let mut active = self.active.lock();
            let Some(state) = active.as_mut() else {
                return;
            };
            if state.visible == visible {
                return;
            }
            state.visible = visible;
            if visible {
                state.child_link = Some(self.connect_child());
                ListEvent::inserted(0, self.child.count())
            } else {
                if let Some(link) = state.child_link.take() {
                    self.child.disconnect_rows(link);
                }
                ListEvent::removed(0, self.child.count())
            }
        };
        if !event.is_empty_range() {
            self.observers.emit(&event);
        }
    }
}

impl<A: Adapter> Adapter for ConditionalAdapter<A> {
    fn count(&self) -> usize {
        if self.visible() {
            self.inner.child.count()
        } else {
            0
        }
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
            let weak: Weak<ConditionalNode<A>> = Arc::downgrade(&self.inner);
            let condition_link = self.inner.condition.on_changed(move |&visible| {
                if let Some(node) = weak.upgrade() {
                    node.on_condition(visible);
                }
            });
            let visible = self.inner.condition.eval();
            let child_link = visible.then(|| self.inner.connect_child());
            *self.inner.active.lock() = Some(Active {
                condition_link,
                child_link,
                visible,
            });
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
        if self.inner.observers.is_empty() {
            if let Some(active) = self.inner.active.lock().take() {
                self.inner.condition.disconnect(active.condition_link);
                if let Some(link) = active.child_link {
                    self.inner.child.disconnect_rows(link);
                }
            }
        }
    }
}
