//! Interleaving divider rows between an adapter's rows.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewItem, ViewKind};
use crate::event::ListEvent;

/// What a divider adapter shows while its child is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DividerEmptyPolicy {
    /// Keep the leading divider, if one is configured.
    ShowLeading,
    /// Show nothing.
    #[default]
    ShowNothing,
}

/// Builds a [`DividerAdapter`]. All divider positions default to off.
pub struct DividerBuilder<A: Adapter> {
    child: A,
    divider: ViewItem,
    leading: bool,
    trailing: bool,
    between: bool,
    policy: DividerEmptyPolicy,
}

impl<A: Adapter> DividerBuilder<A> {
    pub(crate) fn new(child: A, divider: ViewItem) -> Self {
        Self {
            child,
            divider,
            leading: false,
            trailing: false,
            between: false,
            policy: DividerEmptyPolicy::ShowNothing,
        }
    }

    /// Show a divider before the first row.
    pub fn leading(mut self) -> Self {
        self.leading = true;
        self
    }

    /// Show a divider after the last row.
    pub fn trailing(mut self) -> Self {
        self.trailing = true;
        self
    }

    /// Show a divider between every pair of adjacent rows.
    pub fn inner(mut self) -> Self {
        self.between = true;
        self
    }

    /// What to show while the child is empty. Defaults to
    /// [`DividerEmptyPolicy::ShowNothing`].
    pub fn empty_policy(mut self, policy: DividerEmptyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble the adapter.
    pub fn build(self) -> DividerAdapter<A> {
        DividerAdapter {
            inner: Arc::new(DividerNode {
                child: self.child,
                divider: self.divider,
                leading: self.leading,
                trailing: self.trailing,
                between: self.between,
                policy: self.policy,
                observers: Observers::new(),
                link: Mutex::new(None),
            }),
        }
    }
}

/// Standalone divider rows around and between a child's rows.
///
/// Everything is arithmetic on the child count: with inner dividers the
/// child's row `p` sits at `offset + 2p` (offset 1 with a leading divider),
/// and child events widen by the stride. Divider rows are never
/// interactive. Moves degrade to a coarse change; the divider layout around
/// a moved block is not expressible as a single move.
pub struct DividerAdapter<A: Adapter> {
    inner: Arc<DividerNode<A>>,
}

struct DividerNode<A: Adapter> {
    child: A,
    divider: ViewItem,
    leading: bool,
    trailing: bool,
    between: bool,
    policy: DividerEmptyPolicy,
    observers: Observers<ListEvent>,
    link: Mutex<Option<ConnectionId>>,
}

impl<A: Adapter> Clone for DividerAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

enum Row {
    Item(usize),
    Divider,
}

impl<A: Adapter> DividerNode<A> {
    fn stride(&self) -> usize {
        if self.between {
            2
        } else {
            1
        }
    }

    fn offset(&self) -> usize {
        usize::from(self.leading)
    }

    /// The outer count for a child count of `n`.
    fn count_for(&self, n: usize) -> usize {
        if n == 0 {
            usize::from(self.leading && self.policy == DividerEmptyPolicy::ShowLeading)
        } else {
            let base = if self.between { 2 * n - 1 } else { n };
            base + usize::from(self.leading) + usize::from(self.trailing)
        }
    }

    fn classify(&self, position: usize) -> Row {
        let count = self.count_for(self.child.count());
        assert!(
            position < count,
            "position {position} out of bounds (count {count})"
        );
        let n = self.child.count();
        if n == 0 || position < self.offset() {
            return Row::Divider;
        }
        let adjusted = position - self.offset();
        let index = adjusted / self.stride();
        if adjusted % self.stride() == 0 && index < n {
            Row::Item(index)
        } else {
            Row::Divider
        }
    }

    /// Both sides of an empty↔non-empty transition, as remove-all plus
    /// insert-all.
    fn transition(&self, before: usize, after: usize) -> Vec<ListEvent> {
        vec![
            ListEvent::removed(0, self.count_for(before)),
            ListEvent::inserted(0, self.count_for(after)),
        ]
    }

    fn derive(&self, event: &ListEvent) -> Vec<ListEvent> {
        let after = self.child.count();
        let stride = self.stride();
        let offset = self.offset();
        match *event {
            ListEvent::Changed => vec![ListEvent::changed()],
            // A moved block drags a different divider pattern with it.
            ListEvent::RangeMoved { .. } => vec![ListEvent::changed()],
            ListEvent::RangeChanged { start, count } => vec![ListEvent::range_changed(
                offset + stride * start,
                stride * count - (stride - 1),
            )],
            ListEvent::RangeInserted { start, count } => {
                let before = after - count;
                if before == 0 {
                    self.transition(0, after)
                } else if start < before {
                    vec![ListEvent::inserted(offset + stride * start, stride * count)]
                } else {
                    // Appended rows bring the divider before them instead of
                    // one after.
                    vec![ListEvent::inserted(
                        offset + stride * before - (stride - 1),
                        stride * count,
                    )]
                }
            }
            ListEvent::RangeRemoved { start, count } => {
                let before = after + count;
                if after == 0 {
                    self.transition(before, 0)
                } else if start + count == before {
                    vec![ListEvent::removed(
                        offset + stride * start - (stride - 1),
                        stride * count,
                    )]
                } else {
                    vec![ListEvent::removed(offset + stride * start, stride * count)]
                }
            }
        }
    }

    fn on_child_rows(&self, event: &ListEvent) {
        for event in self.derive(event) {
            if !event.is_empty_range() {
                self.observers.emit(&event);
            }
        }
    }
}

impl<A: Adapter> Adapter for DividerAdapter<A> {
    fn count(&self) -> usize {
        self.inner.count_for(self.inner.child.count())
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        match self.inner.classify(position) {
            Row::Item(index) => self.inner.child.view_kind(index),
            Row::Divider => self.inner.divider.kind(),
        }
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        if *kind == self.inner.divider.kind() {
            Some(self.inner.divider.create_view())
        } else {
            self.inner.child.try_create_view(kind)
        }
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        match self.inner.classify(position) {
            Row::Item(index) => self.inner.child.bind_view(index, view),
            Row::Divider => self.inner.divider.bind_into(view),
        }
    }

    fn is_interactive(&self, position: usize) -> bool {
        match self.inner.classify(position) {
            Row::Item(index) => self.inner.child.is_interactive(index),
            Row::Divider => false,
        }
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        match self.inner.classify(position) {
            Row::Item(index) => self.inner.child.stable_id(index),
            Row::Divider => None,
        }
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        let first = self.inner.observers.is_empty();
        let id = self.inner.observers.connect(move |event| slot(event));
        if first {
            let weak: Weak<DividerNode<A>> = Arc::downgrade(&self.inner);
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
