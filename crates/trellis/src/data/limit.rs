//! Data decorator capping the number of visible items.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, ThreadAffinity};

use crate::data::channels::{passthrough_channels, Channels, UpstreamLink};
use crate::data::traits::{
    Available, AvailableSlot, Data, DataExt, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::data::window;
use crate::event::ListEvent;

/// Presents at most `limit` items of its source.
///
/// Upstream events at or beyond the boundary are dropped; events straddling
/// it are split so the emitted deltas match the clamped size change exactly.
/// An insertion into a full window evicts items off the tail; a removal with
/// enough hidden items backfills from beyond the boundary. The limit is
/// adjustable at runtime through [`set_limit`](LimitData::set_limit).
///
/// The loading, available, and error channels pass through unchanged: the
/// cap hides items, it does not stop the source from loading them.
pub struct LimitData<S: Data> {
    inner: Arc<LimitNode<S>>,
}

struct LimitNode<S: Data> {
    source: S,
    limit: Mutex<usize>,
    channels: Channels,
    rows_link: UpstreamLink,
    loading_link: UpstreamLink,
    available_link: UpstreamLink,
    error_link: UpstreamLink,
    affinity: ThreadAffinity,
}

impl<S: Data> Clone for LimitData<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Data> LimitData<S> {
    /// Wrap `source`, showing at most `limit` items.
    pub fn new(source: S, limit: usize) -> Self {
        Self {
            inner: Arc::new(LimitNode {
                source,
                limit: Mutex::new(limit),
                channels: Channels::new(),
                rows_link: UpstreamLink::new(),
                loading_link: UpstreamLink::new(),
                available_link: UpstreamLink::new(),
                error_link: UpstreamLink::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// The current limit.
    pub fn limit(&self) -> usize {
        *self.inner.limit.lock()
    }

    /// Change the limit, surfacing the window delta at the tail.
    pub fn set_limit(&self, limit: usize) {
        self.inner.affinity.debug_assert_owner();
        let events = {
            let mut current = self.inner.limit.lock();
            let old = *current;
            if old == limit {
                return;
            }
            *current = limit;
            window::limit_update_events(old, limit, self.inner.source.size())
        };
        for event in events {
            self.inner.channels.emit_rows(event);
        }
    }
}

impl<S: Data> LimitNode<S> {
    fn on_upstream_rows(&self, event: &ListEvent) {
        let events = {
            let limit = *self.limit.lock();
            window::limit_events(limit, self.source.size(), event)
        };
        for event in events {
            self.channels.emit_rows(event);
        }
    }
}

impl<S: Data> Data for LimitData<S> {
    type Item = S::Item;

    fn size(&self) -> usize {
        self.inner.source.size().min(self.limit())
    }

    fn get(&self, position: usize, flags: GetFlags) -> S::Item {
        let size = self.size();
        assert!(
            position < size,
            "position {position} out of bounds (size {size})"
        );
        self.inner.source.get(position, flags)
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
            let weak: Weak<LimitNode<S>> = Arc::downgrade(&self.inner);
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

    passthrough_channels!(LimitNode<S>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecData;
    use crate::test_util::{Recorder, ShadowVerifier};

    #[test]
    fn test_reads_capped() {
        let source = VecData::from(vec![1, 2, 3, 4]);
        let limit = source.limit(2);

        assert_eq!(limit.size(), 2);
        assert_eq!(limit.item(0), 1);
        assert_eq!(limit.item(1), 2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_beyond_cap_panics() {
        let source = VecData::from(vec![1, 2, 3, 4]);
        let limit = source.limit(2);
        limit.item(2);
    }

    #[test]
    fn test_insert_into_full_window_reports_change() {
        let source = VecData::from(vec![0; 10]);
        let limit = source.clone().limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        source.insert_all(0, vec![1, 2, 3, 4]);
        assert_eq!(recorder.take(), vec![ListEvent::range_changed(0, 5)]);
        assert_eq!(limit.size(), 5);
    }

    #[test]
    fn test_insert_straddling_boundary_evicts_tail() {
        let source = VecData::from(vec![1, 2, 3]);
        let limit = source.clone().limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        source.insert_all(1, vec![7, 8, 9]);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::removed(2, 1), ListEvent::inserted(1, 3)]
        );
        assert_eq!(limit.size(), 5);
    }

    #[test]
    fn test_remove_backfills_from_hidden_items() {
        let source = VecData::from(vec![0; 9]);
        let limit = source.clone().limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        source.remove_range(2, 5);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::removed(2, 3), ListEvent::inserted(2, 2)]
        );
        assert_eq!(limit.size(), 4);
    }

    #[test]
    fn test_events_beyond_boundary_dropped() {
        let source = VecData::from(vec![0; 10]);
        let limit = source.clone().limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        source.set(7, 1);
        source.remove(9);
        source.insert(6, 2);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_set_limit_emits_delta() {
        let source = VecData::from(vec![0; 10]);
        let limit = source.limit(5);
        let recorder = Recorder::new();
        limit.on_rows(recorder.rows_slot());

        limit.set_limit(8);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(5, 3)]);

        limit.set_limit(2);
        assert_eq!(recorder.take(), vec![ListEvent::removed(2, 6)]);
        assert_eq!(limit.size(), 2);
    }

    #[test]
    fn test_shadow_consistency() {
        let source = VecData::from(vec![0; 8]);
        let limit = source.clone().limit(5);
        let verifier = ShadowVerifier::for_data(&limit);

        source.insert_all(2, vec![1, 2, 3]);
        source.remove_range(0, 6);
        source.push(4);
        limit.set_limit(2);
        source.clear();
        limit.set_limit(9);
        source.replace_all(vec![1, 2, 3]);

        verifier.assert_consistent();
    }
}
