//! Data decorator presenting items in comparator order.

use std::cmp::Ordering;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::ConnectionId;

use crate::data::channels::{passthrough_channels, Channels, UpstreamLink};
use crate::data::traits::{
    Available, AvailableSlot, Data, DataExt, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::event::ListEvent;

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Presents its source reordered by a comparator.
///
/// Items comparing equal keep their source order, so the sort is stable.
/// While the rows channel is observed the node keeps a permutation of source
/// positions and patches it from upstream events: an insertion surfaces at
/// its sorted position, and an in-place change that alters an item's rank
/// surfaces as a move. While unobserved the permutation is recomputed on
/// each read.
///
/// On activation the node emits a full-range change so a just-connected
/// observer re-reads content it may have cached while the node was dormant.
pub struct SortData<S: Data> {
    inner: Arc<SortNode<S>>,
}

struct SortNode<S: Data> {
    source: S,
    compare: Mutex<Comparator<S::Item>>,
    /// Source positions in presentation order; `Some` while the rows channel
    /// is observed.
    index: Mutex<Option<Vec<usize>>>,
    channels: Channels,
    rows_link: UpstreamLink,
    loading_link: UpstreamLink,
    available_link: UpstreamLink,
    error_link: UpstreamLink,
}

impl<S: Data> Clone for SortData<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Data> SortData<S> {
    /// Wrap `source`, presenting its items ordered by `compare`.
    pub fn new<C>(source: S, compare: C) -> Self
    where
        C: Fn(&S::Item, &S::Item) -> Ordering + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SortNode {
                source,
                compare: Mutex::new(Arc::new(compare)),
                index: Mutex::new(None),
                channels: Channels::new(),
                rows_link: UpstreamLink::new(),
                loading_link: UpstreamLink::new(),
                available_link: UpstreamLink::new(),
                error_link: UpstreamLink::new(),
            }),
        }
    }

    /// Replace the comparator, rebuilding the order.
    ///
    /// Emits a coarse [`ListEvent::Changed`]: a new comparator can reorder
    /// everything, so there is no finer event worth deriving.
    pub fn set_comparator<C>(&self, compare: C)
    where
        C: Fn(&S::Item, &S::Item) -> Ordering + Send + Sync + 'static,
    {
        *self.inner.compare.lock() = Arc::new(compare);
        let rebuilt = {
            let mut index = self.inner.index.lock();
            match index.as_mut() {
                Some(index) => {
                    *index = self.inner.scan();
                    true
                }
                None => false,
            }
        };
        if rebuilt {
            self.inner.channels.emit_rows(ListEvent::changed());
        }
    }
}

impl<S: Data> SortNode<S> {
    fn comparator(&self) -> Comparator<S::Item> {
        self.compare.lock().clone()
    }

    fn scan(&self) -> Vec<usize> {
        let compare = self.comparator();
        let items: Vec<S::Item> = (0..self.source.size())
            .map(|position| self.source.item(position))
            .collect();
        let mut index: Vec<usize> = (0..items.len()).collect();
        index.sort_by(|&a, &b| compare(&items[a], &items[b]).then(a.cmp(&b)));
        index
    }

    /// Where `item`, living at source position `inner`, belongs in `index`.
    /// Equal items are ordered by source position, which keeps the sort
    /// stable.
    fn insertion_point(&self, index: &[usize], inner: usize, item: &S::Item) -> usize {
        let compare = self.comparator();
        index.partition_point(|&entry| {
            match compare(&self.source.item(entry), item) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => entry < inner,
            }
        })
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
                ListEvent::RangeChanged { start, count } => {
                    let mut events = Vec::new();
                    for inner in start..start + count {
                        let outer = index
                            .iter()
                            .position(|&entry| entry == inner)
                            .expect("changed position must be indexed");
                        index.remove(outer);
                        let item = self.source.item(inner);
                        let target = self.insertion_point(index, inner, &item);
                        index.insert(target, inner);
                        if target == outer {
                            events.push(ListEvent::range_changed(outer, 1));
                        } else {
                            events.push(ListEvent::moved(outer, target, 1));
                            events.push(ListEvent::range_changed(target, 1));
                        }
                    }
                    events
                }
                ListEvent::RangeInserted { start, count } => {
                    for entry in index.iter_mut() {
                        if *entry >= start {
                            *entry += count;
                        }
                    }
                    let mut events = Vec::new();
                    for inner in start..start + count {
                        let item = self.source.item(inner);
                        let target = self.insertion_point(index, inner, &item);
                        index.insert(target, inner);
                        events.push(ListEvent::inserted(target, 1));
                    }
                    events
                }
                ListEvent::RangeRemoved { start, count } => {
                    let mut events = Vec::new();
                    for inner in start..start + count {
                        let outer = index
                            .iter()
                            .position(|&entry| entry == inner)
                            .expect("removed position must be indexed");
                        index.remove(outer);
                        events.push(ListEvent::removed(outer, 1));
                    }
                    for entry in index.iter_mut() {
                        if *entry >= start + count {
                            *entry -= count;
                        }
                    }
                    events
                }
                ListEvent::RangeMoved { from, to, count } => {
                    // Reordering the source does not reorder the
                    // presentation, but it can swap equal-ranked items whose
                    // tie-break changed, so re-sort and report the touched
                    // span.
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
                    let old = index.clone();
                    *index = self.scan();
                    let changed: Vec<usize> = (0..index.len())
                        .filter(|&outer| index[outer] != old[outer])
                        .collect();
                    match (changed.first(), changed.last()) {
                        (Some(&lo), Some(&hi)) => {
                            vec![ListEvent::range_changed(lo, hi - lo + 1)]
                        }
                        _ => Vec::new(),
                    }
                }
            }
        };
        for event in events {
            self.channels.emit_rows(event);
        }
    }
}

impl<S: Data> Data for SortData<S> {
    type Item = S::Item;

    fn size(&self) -> usize {
        self.inner.source.size()
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
            let weak: Weak<SortNode<S>> = Arc::downgrade(&self.inner);
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

    passthrough_channels!(SortNode<S>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecData;
    use crate::test_util::{Recorder, ShadowVerifier};

    fn sorted(source: VecData<i32>) -> SortData<VecData<i32>> {
        source.sort_by(|a, b| a.cmp(b))
    }

    fn items<D: Data>(data: &D) -> Vec<D::Item> {
        (0..data.size()).map(|position| data.item(position)).collect()
    }

    #[test]
    fn test_dormant_reads_sorted() {
        let source = VecData::from(vec![3, 1, 2]);
        let data = sorted(source.clone());

        assert_eq!(items(&data), vec![1, 2, 3]);

        source.push(0);
        assert_eq!(items(&data), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stable_for_equal_ranks() {
        let source = VecData::from(vec![("b", 2), ("a", 1), ("c", 1)]);
        let data = source.sort_by(|x, y| x.1.cmp(&y.1));

        // ("a", 1) precedes ("c", 1) because it comes first in the source.
        assert_eq!(items(&data), vec![("a", 1), ("c", 1), ("b", 2)]);
    }

    #[test]
    fn test_insert_surfaces_at_sorted_position() {
        let source = VecData::from(vec![10, 30, 20]);
        let data = sorted(source.clone());
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());
        recorder.take();

        source.push(15);
        assert_eq!(recorder.take(), vec![ListEvent::inserted(1, 1)]);
        assert_eq!(items(&data), vec![10, 15, 20, 30]);
    }

    #[test]
    fn test_remove_surfaces_at_sorted_position() {
        let source = VecData::from(vec![10, 30, 20]);
        let data = sorted(source.clone());
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());
        recorder.take();

        source.remove(1);
        assert_eq!(recorder.take(), vec![ListEvent::removed(2, 1)]);
        assert_eq!(items(&data), vec![10, 20]);
    }

    #[test]
    fn test_change_that_alters_rank_moves() {
        let source = VecData::from(vec![10, 30, 20]);
        let data = sorted(source.clone());
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());
        recorder.take();

        // 10 -> 25: sorted view [10, 20, 30] -> [20, 25, 30].
        source.set(0, 25);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::moved(0, 1, 1), ListEvent::range_changed(1, 1)]
        );
        assert_eq!(items(&data), vec![20, 25, 30]);
    }

    #[test]
    fn test_change_that_keeps_rank_stays_in_place() {
        let source = VecData::from(vec![10, 30, 20]);
        let data = sorted(source.clone());
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());
        recorder.take();

        source.set(2, 21);
        assert_eq!(recorder.take(), vec![ListEvent::range_changed(1, 1)]);
        assert_eq!(items(&data), vec![10, 21, 30]);
    }

    #[test]
    fn test_source_move_does_not_reorder_presentation() {
        let source = VecData::from(vec![3, 1, 2]);
        let data = sorted(source.clone());
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());
        recorder.take();

        source.move_range(0, 2, 1);
        assert!(recorder.take().is_empty());
        assert_eq!(items(&data), vec![1, 2, 3]);
    }

    #[test]
    fn test_set_comparator_rebuilds() {
        let source = VecData::from(vec![1, 3, 2]);
        let data = sorted(source);
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());
        recorder.take();

        data.set_comparator(|a, b| b.cmp(a));
        assert_eq!(recorder.take(), vec![ListEvent::changed()]);
        assert_eq!(items(&data), vec![3, 2, 1]);
    }

    #[test]
    fn test_shadow_consistency() {
        let source = VecData::from(vec![5, 3, 8, 1]);
        let data = sorted(source.clone());
        let verifier = ShadowVerifier::for_data(&data);

        source.push(4);
        source.set(0, 0);
        source.remove_range(1, 2);
        source.replace_all(vec![9, 2, 7]);
        source.move_range(0, 1, 1);
        source.clear();

        verifier.assert_consistent();
    }
}
