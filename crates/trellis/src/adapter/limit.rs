//! Adapter decorator capping the number of visible rows.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers, ThreadAffinity};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewKind};
use crate::data::window;
use crate::event::ListEvent;

/// Presents at most `limit` rows of its inner adapter.
///
/// Same arithmetic as the data-level window: events beyond the boundary are
/// dropped, straddling insertions evict from the tail, and straddling
/// removals backfill from hidden rows.
pub struct LimitAdapter<A: Adapter> {
    inner: Arc<LimitNode<A>>,
}

struct LimitNode<A: Adapter> {
    child: A,
    limit: Mutex<usize>,
    observers: Observers<ListEvent>,
    link: Mutex<Option<ConnectionId>>,
    affinity: ThreadAffinity,
}

impl<A: Adapter> Clone for LimitAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Adapter> LimitAdapter<A> {
    /// Wrap `child`, showing at most `limit` rows.
    pub fn new(child: A, limit: usize) -> Self {
        Self {
            inner: Arc::new(LimitNode {
                child,
                limit: Mutex::new(limit),
                observers: Observers::new(),
                link: Mutex::new(None),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// The current limit.
    pub fn limit(&self) -> usize {
        *self.inner.limit.lock()
    }

    /// Change the limit, surfacing the row delta at the tail.
    pub fn set_limit(&self, limit: usize) {
        self.inner.affinity.debug_assert_owner();
        let events = {
            let mut current = self.inner.limit.lock();
            let old = *current;
            if old == limit {
                return;
            }
            *current = limit;
            window::limit_update_events(old, limit, self.inner.child.count())
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
        position
    }
}

impl<A: Adapter> LimitNode<A> {
    fn on_child_rows(&self, event: &ListEvent) {
        let events = {
            let limit = *self.limit.lock();
            window::limit_events(limit, self.child.count(), event)
        };
        for event in events {
            if !event.is_empty_range() {
                self.observers.emit(&event);
            }
        }
    }
}

impl<A: Adapter> Adapter for LimitAdapter<A> {
    fn count(&self) -> usize {
        self.inner.child.count().min(self.limit())
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
            let weak: Weak<LimitNode<A>> = Arc::downgrade(&self.inner);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterExt;
    use crate::test_util::{Recorder, ShadowVerifier, StubAdapter};

    #[test]
    fn test_count_is_min() {
        let child = StubAdapter::with_count(10);
        assert_eq!(child.clone().limit(5).count(), 5);
        assert_eq!(child.clone().limit(15).count(), 10);
        assert_eq!(child.limit(0).count(), 0);
    }

    #[test]
    fn test_insert_into_full_window_reports_change() {
        let child = StubAdapter::with_count(10);
        let limit = child.clone().limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        child.insert(0, 4);
        assert_eq!(recorder.take(), vec![ListEvent::range_changed(0, 5)]);
    }

    #[test]
    fn test_boundary_straddling_splits() {
        let child = StubAdapter::with_count(3);
        let limit = child.clone().limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        child.insert(1, 3);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::removed(2, 1), ListEvent::inserted(1, 3)]
        );

        child.remove(2, 3);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::removed(2, 3), ListEvent::inserted(2, 1)]
        );
    }

    #[test]
    fn test_set_limit_emits_delta() {
        let child = StubAdapter::with_count(10);
        let limit = child.limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        limit.set_limit(7);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(5, 2)]);
        limit.set_limit(3);
        assert_eq!(recorder.take(), vec![ListEvent::removed(3, 4)]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_beyond_cap_panics() {
        let child = StubAdapter::with_count(10);
        child.limit(5).view_kind(5);
    }

    #[test]
    fn test_shadow_consistency() {
        let child = StubAdapter::with_count(8);
        let limit = child.clone().limit(5);
        let verifier = ShadowVerifier::for_adapter(&limit);

        child.insert(2, 3);
        child.remove(0, 6);
        limit.set_limit(2);
        child.remove(0, 5);

        verifier.assert_consistent();
    }
}
