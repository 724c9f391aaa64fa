//! Data decorator presenting only items matching a predicate.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, ThreadAffinity};

use crate::data::channels::{passthrough_channels, Channels, UpstreamLink};
use crate::data::traits::{
    Available, AvailableSlot, Data, DataExt, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::event::ListEvent;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Presents only the source items matching a predicate, in source order.
///
/// While the rows channel is observed, the node keeps a sorted index of
/// matching source positions and patches it incrementally from upstream
/// events, so a change upstream surfaces as the precise insertion, removal,
/// or in-place change of the affected matching items. While unobserved it
/// holds no state and answers reads by scanning the source, so reads stay
/// valid either way.
///
/// On activation the node emits a full-range change so a just-connected
/// observer re-reads content it may have cached while the node was dormant.
pub struct FilterData<S: Data> {
    inner: Arc<FilterNode<S>>,
}

struct FilterNode<S: Data> {
    source: S,
    predicate: Mutex<Predicate<S::Item>>,
    /// Sorted source positions of matching items; `Some` while the rows
    /// channel is observed.
    index: Mutex<Option<Vec<usize>>>,
    channels: Channels,
    rows_link: UpstreamLink,
    loading_link: UpstreamLink,
    available_link: UpstreamLink,
    error_link: UpstreamLink,
    affinity: ThreadAffinity,
}

impl<S: Data> Clone for FilterData<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Data> FilterData<S> {
    /// Wrap `source`, keeping only items matching `predicate`.
    pub fn new<P>(source: S, predicate: P) -> Self
    where
        P: Fn(&S::Item) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(FilterNode {
                source,
                predicate: Mutex::new(Arc::new(predicate)),
                index: Mutex::new(None),
                channels: Channels::new(),
                rows_link: UpstreamLink::new(),
                loading_link: UpstreamLink::new(),
                available_link: UpstreamLink::new(),
                error_link: UpstreamLink::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// Replace the predicate, emitting the precise difference between the
    /// old and new views.
    pub fn set_predicate<P>(&self, predicate: P)
    where
        P: Fn(&S::Item) -> bool + Send + Sync + 'static,
    {
        self.inner.affinity.debug_assert_owner();
        *self.inner.predicate.lock() = Arc::new(predicate);
        let events = {
            let mut index = self.inner.index.lock();
            match index.as_mut() {
                Some(index) => self.inner.diff_range(index, 0, self.inner.source.size()),
                None => Vec::new(),
            }
        };
        for event in events {
            self.inner.channels.emit_rows(event);
        }
    }
}

impl<S: Data> FilterNode<S> {
    fn predicate(&self) -> Predicate<S::Item> {
        self.predicate.lock().clone()
    }

    fn scan(&self) -> Vec<usize> {
        let predicate = self.predicate();
        (0..self.source.size())
            .filter(|&position| predicate(&self.source.item(position)))
            .collect()
    }

    /// Re-evaluate source positions `start..start + count` against the
    /// current predicate, patching `index` and returning the events
    /// describing the difference.
    fn diff_range(&self, index: &mut Vec<usize>, start: usize, count: usize) -> Vec<ListEvent> {
        let predicate = self.predicate();
        let mut events = Vec::new();
        for position in start..start + count {
            let included = predicate(&self.source.item(position));
            match (index.binary_search(&position), included) {
                (Ok(outer), true) => events.push(ListEvent::range_changed(outer, 1)),
                (Ok(outer), false) => {
                    index.remove(outer);
                    events.push(ListEvent::removed(outer, 1));
                }
                (Err(outer), true) => {
                    index.insert(outer, position);
                    events.push(ListEvent::inserted(outer, 1));
                }
                (Err(_), false) => {}
            }
        }
        events
    }

    fn on_upstream_rows(&self, event: &ListEvent) {
        let events = {
            let mut guard = self.index.lock();
            let Some(index) = guard.as_mut() else {
                return;
            };
            match *event {
                ListEvent::Changed => {
                    *index = self.scan();
                    vec![ListEvent::changed()]
                }
                ListEvent::RangeChanged { start, count } => self.diff_range(index, start, count),
                ListEvent::RangeInserted { start, count } => {
                    for entry in index.iter_mut() {
                        if *entry >= start {
                            *entry += count;
                        }
                    }
                    let predicate = self.predicate();
                    let outer = index.partition_point(|&entry| entry < start);
                    let included: Vec<usize> = (start..start + count)
                        .filter(|&position| predicate(&self.source.item(position)))
                        .collect();
                    let added = included.len();
                    index.splice(outer..outer, included);
                    if added > 0 {
                        vec![ListEvent::inserted(outer, added)]
                    } else {
                        Vec::new()
                    }
                }
                ListEvent::RangeRemoved { start, count } => {
                    let lo = index.partition_point(|&entry| entry < start);
                    let hi = index.partition_point(|&entry| entry < start + count);
                    index.drain(lo..hi);
                    for entry in index.iter_mut().skip(lo) {
                        *entry -= count;
                    }
                    if hi > lo {
                        vec![ListEvent::removed(lo, hi - lo)]
                    } else {
                        Vec::new()
                    }
                }
                ListEvent::RangeMoved { from, to, count } => {
                    let lo = index.partition_point(|&entry| entry < from);
                    let hi = index.partition_point(|&entry| entry < from + count);
                    let included = hi - lo;
                    for entry in index.iter_mut() {
                        let position = *entry;
                        *entry = if (from..from + count).contains(&position) {
                            to + (position - from)
                        } else {
                            let shifted = if position < from {
                                position
                            } else {
                                position - count
                            };
                            if shifted >= to { shifted + count } else { shifted }
                        };
                    }
                    index.sort_unstable();
                    let outer_to = index.partition_point(|&entry| entry < to);
                    if included > 0 && lo != outer_to {
                        vec![ListEvent::moved(lo, outer_to, included)]
                    } else {
                        Vec::new()
                    }
                }
            }
        };
        for event in events {
            self.channels.emit_rows(event);
        }
    }
}

impl<S: Data> Data for FilterData<S> {
    type Item = S::Item;

    fn size(&self) -> usize {
        match self.inner.index.lock().as_ref() {
            Some(index) => index.len(),
            None => self.inner.scan().len(),
        }
    }

    fn get(&self, position: usize, flags: GetFlags) -> S::Item {
        let source_position = {
            let guard = self.inner.index.lock();
            match guard.as_ref() {
                Some(index) => index.get(position).copied(),
                None => self.inner.scan().get(position).copied(),
            }
        };
        match source_position {
            Some(source_position) => self.inner.source.get(source_position, flags),
            None => panic!("position {position} out of bounds (size {})", self.size()),
        }
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
            let size = {
                let mut index = self.inner.index.lock();
                let built = self.inner.scan();
                let size = built.len();
                *index = Some(built);
                size
            };
            let weak: Weak<FilterNode<S>> = Arc::downgrade(&self.inner);
            self.inner.rows_link.attach(self.inner.source.on_rows(move |event| {
                if let Some(node) = weak.upgrade() {
                    node.on_upstream_rows(event);
                }
            }));
            self.inner
                .channels
                .emit_rows(ListEvent::range_changed(0, size));
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.channels.rows.disconnect(id);
        if self.inner.channels.rows.is_empty() {
            if let Some(link) = self.inner.rows_link.detach() {
                self.inner.source.disconnect_rows(link);
            }
            *self.inner.index.lock() = None;
        }
    }

    passthrough_channels!(FilterNode<S>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecData;
    use crate::test_util::{Recorder, ShadowVerifier};

    fn evens(source: VecData<i32>) -> FilterData<VecData<i32>> {
        source.filter(|n| n % 2 == 0)
    }

    #[test]
    fn test_dormant_reads_scan_source() {
        let source = VecData::from(vec![1, 2, 3, 4, 5, 6]);
        let filtered = evens(source.clone());

        assert_eq!(filtered.size(), 3);
        assert_eq!(filtered.item(0), 2);
        assert_eq!(filtered.item(2), 6);

        source.push(8);
        assert_eq!(filtered.size(), 4);
    }

    #[test]
    fn test_activation_emits_full_range_change() {
        let source = VecData::from(vec![1, 2, 3, 4]);
        let filtered = evens(source);
        let recorder = Recorder::new();
        filtered.on_rows(recorder.rows_slot());

        assert_eq!(recorder.take(), vec![ListEvent::range_changed(0, 2)]);
    }

    #[test]
    fn test_insert_surfaces_only_matching_items() {
        let source = VecData::from(vec![2, 4]);
        let filtered = evens(source.clone());
        let recorder = Recorder::new();
        filtered.on_rows(recorder.rows_slot());
        recorder.take();

        source.insert_all(1, vec![5, 6, 7]);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(1, 1)]);
        assert_eq!(filtered.item(1), 6);

        source.insert(0, 9);
        assert!(recorder.take().is_empty());
        assert_eq!(filtered.size(), 3);
    }

    #[test]
    fn test_remove_surfaces_only_matching_items() {
        let source = VecData::from(vec![1, 2, 3, 4, 5, 6]);
        let filtered = evens(source.clone());
        let recorder = Recorder::new();
        filtered.on_rows(recorder.rows_slot());
        recorder.take();

        // Drops 3, 4, 5: only 4 was visible.
        source.remove_range(2, 3);
        assert_eq!(recorder.take(), vec![ListEvent::removed(1, 1)]);
        assert_eq!(filtered.size(), 2);
        assert_eq!(filtered.item(1), 6);
    }

    #[test]
    fn test_in_place_change_toggles_membership() {
        let source = VecData::from(vec![1, 2, 3]);
        let filtered = evens(source.clone());
        let recorder = Recorder::new();
        filtered.on_rows(recorder.rows_slot());
        recorder.take();

        source.set(0, 10);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(0, 1)]);

        source.set(1, 7);
        assert_eq!(recorder.take(), vec![ListEvent::removed(1, 1)]);

        source.set(0, 12);
        assert_eq!(recorder.take(), vec![ListEvent::range_changed(0, 1)]);
        assert_eq!(filtered.size(), 1);
    }

    #[test]
    fn test_move_relocates_matching_subset() {
        let source = VecData::from(vec![2, 4, 1, 6]);
        let filtered = evens(source.clone());
        let recorder = Recorder::new();
        filtered.on_rows(recorder.rows_slot());
        recorder.take();

        // [2, 4, 1, 6] -> [1, 6, 2, 4]: visible [2, 4, 6] -> [6, 2, 4].
        source.move_range(0, 2, 2);
        assert_eq!(recorder.take(), vec![ListEvent::moved(0, 1, 2)]);
        assert_eq!(filtered.item(0), 6);
        assert_eq!(filtered.item(1), 2);
    }

    #[test]
    fn test_set_predicate_emits_difference() {
        let source = VecData::from(vec![1, 2, 3, 4]);
        let filtered = evens(source);
        let recorder = Recorder::new();
        filtered.on_rows(recorder.rows_slot());
        recorder.take();

        filtered.set_predicate(|&n| n > 2);
        assert_eq!(
            recorder.take(),
            vec![
                ListEvent::removed(0, 1),
                ListEvent::inserted(0, 1),
                ListEvent::range_changed(1, 1),
            ]
        );
        assert_eq!(filtered.size(), 2);
        assert_eq!(filtered.item(0), 3);
    }

    #[test]
    fn test_shadow_consistency() {
        let source = VecData::from(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let filtered = evens(source.clone());
        let verifier = ShadowVerifier::for_data(&filtered);

        source.insert_all(3, vec![10, 11]);
        source.remove_range(0, 4);
        source.set(0, 2);
        source.move_range(0, 3, 2);
        filtered.set_predicate(|&n| n > 4);
        source.clear();

        verifier.assert_consistent();
    }
}
