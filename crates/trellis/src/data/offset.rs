//! Data decorator hiding a fixed number of leading items.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, ThreadAffinity};

use crate::data::channels::{passthrough_channels, Channels, UpstreamLink};
use crate::data::traits::{
    Available, AvailableSlot, Data, DataExt, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::data::window;
use crate::event::ListEvent;

/// Presents its source with the first `offset` items hidden.
///
/// Positions are shifted down by the offset; upstream events below the
/// boundary are dropped, straddling events are clipped, and insertions or
/// removals surface their net window delta at position 0. The offset is
/// adjustable at runtime through [`set_offset`](OffsetData::set_offset).
pub struct OffsetData<S: Data> {
    inner: Arc<OffsetNode<S>>,
}

struct OffsetNode<S: Data> {
    source: S,
    offset: Mutex<usize>,
    channels: Channels,
    rows_link: UpstreamLink,
    loading_link: UpstreamLink,
    available_link: UpstreamLink,
    error_link: UpstreamLink,
    affinity: ThreadAffinity,
}

impl<S: Data> Clone for OffsetData<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Data> OffsetData<S> {
    /// Wrap `source`, hiding its first `offset` items.
    pub fn new(source: S, offset: usize) -> Self {
        Self {
            inner: Arc::new(OffsetNode {
                source,
                offset: Mutex::new(offset),
                channels: Channels::new(),
                rows_link: UpstreamLink::new(),
                loading_link: UpstreamLink::new(),
                available_link: UpstreamLink::new(),
                error_link: UpstreamLink::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// The current offset.
    pub fn offset(&self) -> usize {
        *self.inner.offset.lock()
    }

    /// Change the offset, surfacing the window delta at position 0.
    pub fn set_offset(&self, offset: usize) {
        self.inner.affinity.debug_assert_owner();
        let events = {
            let mut current = self.inner.offset.lock();
            let old = *current;
            if old == offset {
                return;
            }
            *current = offset;
            window::offset_update_events(old, offset, self.inner.source.size())
        };
        for event in events {
            self.inner.channels.emit_rows(event);
        }
    }
}

impl<S: Data> OffsetNode<S> {
    fn on_upstream_rows(&self, event: &ListEvent) {
        let events = {
            let offset = *self.offset.lock();
            window::offset_events(offset, self.source.size(), event)
        };
        for event in events {
            self.channels.emit_rows(event);
        }
    }
}

impl<S: Data> Data for OffsetData<S> {
    type Item = S::Item;

    fn size(&self) -> usize {
        self.inner.source.size().saturating_sub(self.offset())
    }

    fn get(&self, position: usize, flags: GetFlags) -> S::Item {
        let size = self.size();
        assert!(
            position < size,
            "position {position} out of bounds (size {size})"
        );
        self.inner.source.get(position + self.offset(), flags)
    }

    fn is_loading(&self) -> bool {
        self.inner.source.is_loading()
    }

    fn available(&self) -> Available {
        self.inner.source.available()
    }

    fn invalidate(&self) {
        self.inner.source.invalidate();
    }

    fn refresh(&self) {
        self.inner.source.refresh();
    }

    fn reload(&self) {
        self.inner.source.reload();
    }

    fn connect_rows(&self, slot: RowsSlot) -> ConnectionId {
        let first = self.inner.channels.rows.is_empty();
        let id = self.inner.channels.rows.connect(move |event| slot(event));
        if first {
            let weak: Weak<OffsetNode<S>> = Arc::downgrade(&self.inner);
            self.inner.rows_link.attach(self.inner.source.on_rows(move |event| {
                if let Some(node) = weak.upgrade() {
                    node.on_upstream_rows(event);
                }
            }));
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.channels.rows.disconnect(id);
        if self.inner.channels.rows.is_empty() {
            if let Some(link) = self.inner.rows_link.detach() {
                self.inner.source.disconnect_rows(link);
            }
        }
    }

    passthrough_channels!(OffsetNode<S>);
}
