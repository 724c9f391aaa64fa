//! Surrounding an adapter with header and footer rows.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewItem, ViewKind};
use crate::event::ListEvent;

/// What happens to headers and footers while the content is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Keep them visible regardless of content.
    #[default]
    Show,
    /// Hide them while the content has no rows.
    Hide,
}

/// Builds a [`HeaderFooterAdapter`]: header rows above the content, footer
/// rows below it, with an [`EmptyPolicy`] tying their visibility to the
/// content count.
pub struct HeaderFooterBuilder<A: Adapter> {
    content: A,
    headers: Vec<ViewItem>,
    footers: Vec<ViewItem>,
    policy: EmptyPolicy,
}

impl<A: Adapter> HeaderFooterBuilder<A> {
    pub(crate) fn new(content: A) -> Self {
        Self {
            content,
            headers: Vec::new(),
            footers: Vec::new(),
            policy: EmptyPolicy::Show,
        }
    }

    /// Add a header row above the content. Headers stack in call order.
    pub fn header(mut self, item: ViewItem) -> Self {
        self.headers.push(item);
        self
    }

    /// Add a footer row below the content. Footers stack in call order.
    pub fn footer(mut self, item: ViewItem) -> Self {
        self.footers.push(item);
        self
    }

    /// What to do while the content is empty. Defaults to [`EmptyPolicy::Show`].
    pub fn empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble the composed adapter.
    pub fn build(self) -> HeaderFooterAdapter<A> {
        HeaderFooterAdapter {
            inner: Arc::new(HeaderFooterNode {
                content: self.content,
                headers: self.headers,
                footers: self.footers,
                policy: self.policy,
                observers: Observers::new(),
                active: Mutex::new(None),
            }),
        }
    }
}

/// Header rows, content, footer rows, as one adapter.
///
/// A single subscription on the content keeps the block visibility and the
/// remapped content events in one ordered stream, so observers always see a
/// replayable sequence: blocks appear before the first content row's
/// insertion is reported below them, and disappear after the last one's
/// removal.
pub struct HeaderFooterAdapter<A: Adapter> {
    inner: Arc<HeaderFooterNode<A>>,
}

struct HeaderFooterNode<A: Adapter> {
    content: A,
    headers: Vec<ViewItem>,
    footers: Vec<ViewItem>,
    policy: EmptyPolicy,
    observers: Observers<ListEvent>,
    active: Mutex<Option<Active>>,
}

struct Active {
    link: ConnectionId,
    shown: bool,
}

impl<A: Adapter> Clone for HeaderFooterAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn shift(event: &ListEvent, by: usize) -> ListEvent {
    match *event {
        ListEvent::Changed => ListEvent::changed(),
        ListEvent::RangeChanged { start, count } => ListEvent::range_changed(start + by, count),
        ListEvent::RangeInserted { start, count } => ListEvent::inserted(start + by, count),
        ListEvent::RangeRemoved { start, count } => ListEvent::removed(start + by, count),
        ListEvent::RangeMoved { from, to, count } => ListEvent::moved(from + by, to + by, count),
    }
}

impl<A: Adapter> HeaderFooterNode<A> {
    fn wants_blocks(&self, content_count: usize) -> bool {
        match self.policy {
            EmptyPolicy::Show => true,
            EmptyPolicy::Hide => content_count > 0,
        }
    }

    fn shown(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(active) => active.shown,
            None => self.wants_blocks(self.content.count()),
        }
    }

    fn on_content_rows(&self, event: &ListEvent) {
        let events = {
            let mut active = self.active.lock();
            let Some(state) = active.as_mut() else {
                return;
            };
            let after = self.content.count();
            let new_shown = self.wants_blocks(after);
            let old_shown = state.shown;
            state.shown = new_shown;

            let h = self.headers.len();
            let f = self.footers.len();
            if matches!(event, ListEvent::Changed) {
                vec![ListEvent::changed()]
            } else {
                match (old_shown, new_shown) {
                    (true, true) => vec![shift(event, h)],
                    (false, false) => vec![*event],
                    // First content row: blocks wrap around it.
                    (false, true) => vec![
                        ListEvent::inserted(0, h),
                        shift(event, h),
                        ListEvent::inserted(h + after, f),
                    ],
                    // Last content row gone: blocks follow it out.
                    (true, false) => vec![
                        shift(event, h),
                        ListEvent::removed(0, h),
                        ListEvent::removed(0, f),
                    ],
                }
            }
        };
        for event in events {
            if !event.is_empty_range() {
                self.observers.emit(&event);
            }
        }
    }
}

impl<A: Adapter> Adapter for HeaderFooterAdapter<A> {
    fn count(&self) -> usize {
        let node = &self.inner;
        let content = node.content.count();
        if node.shown() {
            node.headers.len() + content + node.footers.len()
        } else {
            content
        }
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        let count = self.count();
        assert!(
            position < count,
            "position {position} out of bounds (count {count})"
        );
        let node = &self.inner;
        let h = if node.shown() { node.headers.len() } else { 0 };
        let content = node.content.count();
        if position < h {
            node.headers[position].kind()
        } else if position < h + content {
            node.content.view_kind(position - h)
        } else {
            node.footers[position - h - content].kind()
        }
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        let node = &self.inner;
        node.headers
            .iter()
            .chain(node.footers.iter())
            .find(|item| item.kind() == *kind)
            .map(|item| item.create_view())
            .or_else(|| node.content.try_create_view(kind))
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        let count = self.count();
        assert!(
            position < count,
            "position {position} out of bounds (count {count})"
        );
        let node = &self.inner;
        let h = if node.shown() { node.headers.len() } else { 0 };
        let content = node.content.count();
        if position < h {
            node.headers[position].bind_into(view)
        } else if position < h + content {
            node.content.bind_view(position - h, view)
        } else {
            node.footers[position - h - content].bind_into(view)
        }
    }

    fn is_interactive(&self, position: usize) -> bool {
        let node = &self.inner;
        let h = if node.shown() { node.headers.len() } else { 0 };
        let content = node.content.count();
        if position < h {
            node.headers[position].is_interactive()
        } else if position < h + content {
            node.content.is_interactive(position - h)
        } else {
            node.footers[position - h - content].is_interactive()
        }
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        let node = &self.inner;
        let h = if node.shown() { node.headers.len() } else { 0 };
        let content = node.content.count();
        if position >= h && position < h + content {
            node.content.stable_id(position - h)
        } else {
            None
        }
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        let first = self.inner.observers.is_empty();
        let id = self.inner.observers.connect(move |event| slot(event));
        if first {
            let weak: Weak<HeaderFooterNode<A>> = Arc::downgrade(&self.inner);
            let link = self.inner.content.connect_rows(Box::new(move |event| {
                if let Some(node) = weak.upgrade() {
                    node.on_content_rows(event);
                }
            }));
            let shown = self.inner.wants_blocks(self.inner.content.count());
            *self.inner.active.lock() = Some(Active { link, shown });
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
        if self.inner.observers.is_empty() {
            if let Some(active) = self.inner.active.lock().take() {
                self.inner.content.disconnect_rows(active.link);
            }
        }
    }
}
