//! End-to-end splicing of several adapters.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewKind};
use crate::event::ListEvent;

/// Presents several child adapters one after another.
///
/// Row positions run through the children in order; empty children take up
/// no positions. Child events remap by the child's cumulative offset, which
/// is tracked in a table rebuilt lazily after any count-changing event. The
/// children are observed only while the concatenation itself is observed.
pub struct ConcatAdapter {
    inner: Arc<ConcatNode>,
}

struct ConcatNode {
    children: Vec<Box<dyn Adapter>>,
    /// Cumulative child starts plus the total, cached only while observed;
    /// `None` means stale (or dormant).
    offsets: Mutex<Option<Offsets>>,
    observers: Observers<ListEvent>,
    /// Connections into the children while observed, one per child.
    links: Mutex<Vec<ConnectionId>>,
}

#[derive(Clone)]
struct Offsets {
    starts: Vec<usize>,
    total: usize,
}

impl Clone for ConcatAdapter {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ConcatAdapter {
    /// Splice `children` end to end.
    pub fn new(children: Vec<Box<dyn Adapter>>) -> Self {
        Self {
            inner: Arc::new(ConcatNode {
                children,
                offsets: Mutex::new(None),
                observers: Observers::new(),
                links: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl ConcatNode {
    fn build_offsets(&self) -> Offsets {
        let mut starts = Vec::with_capacity(self.children.len());
        let mut total = 0;
        for child in &self.children {
            starts.push(total);
            total += child.count();
        }
        Offsets { starts, total }
    }

    /// The current offsets table. Cached only while observed; a dormant
    /// concatenation cannot hear about child changes, so it recomputes.
    fn offsets(&self) -> Offsets {
        let mut cache = self.offsets.lock();
        if let Some(offsets) = cache.as_ref() {
            return offsets.clone();
        }
        let offsets = self.build_offsets();
        if !self.observers.is_empty() {
            *cache = Some(offsets.clone());
        }
        offsets
    }

    /// Resolve an outer position to `(child index, inner position)`.
    ///
    /// Boundary positions resolve to the last child starting there, which
    /// steps over empty children.
    fn route(&self, position: usize) -> (usize, usize) {
        let offsets = self.offsets();
        assert!(
            position < offsets.total,
            "position {position} out of bounds (count {})",
            offsets.total
        );
        let child = offsets.starts.partition_point(|&start| start <= position) - 1;
        (child, position - offsets.starts[child])
    }

    fn on_child_rows(&self, child: usize, event: &ListEvent) {
        if matches!(
            event,
            ListEvent::Changed | ListEvent::RangeInserted { .. } | ListEvent::RangeRemoved { .. }
        ) {
            *self.offsets.lock() = None;
        }
        let outer = match *event {
            ListEvent::Changed => ListEvent::changed(),
            other => {
                let start = self.offsets().starts[child];
                match other {
                    ListEvent::RangeChanged { start: s, count } => {
                        ListEvent::range_changed(start + s, count)
                    }
                    ListEvent::RangeInserted { start: s, count } => {
                        ListEvent::inserted(start + s, count)
                    }
                    ListEvent::RangeRemoved { start: s, count } => {
                        ListEvent::removed(start + s, count)
                    }
                    ListEvent::RangeMoved { from, to, count } => {
                        ListEvent::moved(start + from, start + to, count)
                    }
                    ListEvent::Changed => unreachable!(),
                }
            }
        };
        tracing::trace!(target: "trellis::adapter", child, event = ?outer, "concat relay");
        self.observers.emit(&outer);
    }
}

impl Adapter for ConcatAdapter {
    fn count(&self) -> usize {
        self.inner.offsets().total
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        let (child, inner) = self.inner.route(position);
        self.inner.children[child].view_kind(inner)
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        self.inner
            .children
            .iter()
            .find_map(|child| child.try_create_view(kind))
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        let (child, inner) = self.inner.route(position);
        self.inner.children[child].bind_view(inner, view)
    }

    fn is_interactive(&self, position: usize) -> bool {
        let (child, inner) = self.inner.route(position);
        self.inner.children[child].is_interactive(inner)
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        let (child, inner) = self.inner.route(position);
        self.inner.children[child].stable_id(inner)
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        let first = self.inner.observers.is_empty();
        let id = self.inner.observers.connect(move |event| slot(event));
        if first {
            *self.inner.offsets.lock() = Some(self.inner.build_offsets());
            let mut links = self.inner.links.lock();
            debug_assert!(links.is_empty(), "child links left over from a previous activation");
            for (index, child) in self.inner.children.iter().enumerate() {
                let weak: Weak<ConcatNode> = Arc::downgrade(&self.inner);
                links.push(child.connect_rows(Box::new(move |event| {
                    if let Some(node) = weak.upgrade() {
                        node.on_child_rows(index, event);
                    }
                })));
            }
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
        if self.inner.observers.is_empty() {
            let links: Vec<ConnectionId> = self.inner.links.lock().drain(..).collect();
            for (child, link) in self.inner.children.iter().zip(links) {
                child.disconnect_rows(link);
            }
            *self.inner.offsets.lock() = None;
        }
    }
}
