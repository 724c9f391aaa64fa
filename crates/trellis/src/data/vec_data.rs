//! Mutable vec-backed data source.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{ConnectionId, ThreadAffinity};

use crate::data::channels::Channels;
use crate::data::traits::{
    Available, AvailableSlot, Data, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::event::ListEvent;

/// A mutable, fully synchronous data source backed by a `Vec`.
///
/// Every mutator emits the exact [`ListEvent`] describing it, which makes
/// `VecData` both the natural leaf of a decorator chain and a convenient
/// scripted source in tests. It never loads: `is_loading` is always `false`
/// and `available` is always [`Available::Exactly`]`(0)`.
///
/// Handles are cheap clones sharing the same contents.
///
/// # Example
///
/// ```
/// use trellis::data::{Data, DataExt, VecData};
///
/// let data = VecData::from(vec![1, 2, 3]);
/// data.push(4);
/// assert_eq!(data.size(), 4);
/// assert_eq!(data.item(3), 4);
/// ```
pub struct VecData<T> {
    inner: Arc<VecNode<T>>,
}

struct VecNode<T> {
    items: Mutex<Vec<T>>,
    channels: Channels,
    affinity: ThreadAffinity,
}

impl<T> Clone for VecData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for VecData<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> From<Vec<T>> for VecData<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(VecNode {
                items: Mutex::new(items),
                channels: Channels::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }
}

impl<T: Clone + Send + 'static> VecData<T> {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    /// Append an item, emitting an insertion at the tail.
    pub fn push(&self, item: T) {
        self.inner.affinity.debug_assert_owner();
        let position = {
            let mut items = self.inner.items.lock();
            items.push(item);
            items.len() - 1
        };
        self.inner.channels.emit_rows(ListEvent::inserted(position, 1));
    }

    /// Insert an item at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position > size()`.
    pub fn insert(&self, position: usize, item: T) {
        self.inner.affinity.debug_assert_owner();
        self.inner.items.lock().insert(position, item);
        self.inner.channels.emit_rows(ListEvent::inserted(position, 1));
    }

    /// Insert several items at `position`, emitting a single insertion.
    pub fn insert_all(&self, position: usize, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        self.inner.affinity.debug_assert_owner();
        let count = new_items.len();
        {
            let mut items = self.inner.items.lock();
            items.splice(position..position, new_items);
        }
        self.inner
            .channels
            .emit_rows(ListEvent::inserted(position, count));
    }

    /// Remove and return the item at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position >= size()`.
    pub fn remove(&self, position: usize) -> T {
        self.inner.affinity.debug_assert_owner();
        let item = self.inner.items.lock().remove(position);
        self.inner.channels.emit_rows(ListEvent::removed(position, 1));
        item
    }

    /// Remove a contiguous run of items.
    pub fn remove_range(&self, position: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.inner.affinity.debug_assert_owner();
        {
            let mut items = self.inner.items.lock();
            items.drain(position..position + count);
        }
        self.inner
            .channels
            .emit_rows(ListEvent::removed(position, count));
    }

    /// Replace the item at `position`, emitting an in-place change.
    pub fn set(&self, position: usize, item: T) {
        self.inner.affinity.debug_assert_owner();
        self.inner.items.lock()[position] = item;
        self.inner
            .channels
            .emit_rows(ListEvent::range_changed(position, 1));
    }

    /// Re-emit a change for items already mutated in place through other
    /// means, such as interior mutability of the item type.
    pub fn notify_changed(&self, position: usize, count: usize) {
        self.inner.affinity.debug_assert_owner();
        let size = self.inner.items.lock().len();
        assert!(
            position + count <= size,
            "change of {count} items at {position} out of bounds (size {size})"
        );
        self.inner
            .channels
            .emit_rows(ListEvent::range_changed(position, count));
    }

    /// Relocate `count` items from `from` to `to`, where `to` is the
    /// destination measured after the block is taken out.
    pub fn move_range(&self, from: usize, to: usize, count: usize) {
        if count == 0 || from == to {
            return;
        }
        self.inner.affinity.debug_assert_owner();
        {
            let mut items = self.inner.items.lock();
            let block: Vec<T> = items.drain(from..from + count).collect();
            items.splice(to..to, block);
        }
        self.inner
            .channels
            .emit_rows(ListEvent::moved(from, to, count));
    }

    /// Remove every item, emitting a single removal.
    pub fn clear(&self) {
        self.inner.affinity.debug_assert_owner();
        let old = {
            let mut items = self.inner.items.lock();
            let old = items.len();
            items.clear();
            old
        };
        if old > 0 {
            self.inner.channels.emit_rows(ListEvent::removed(0, old));
        }
    }

    /// Replace the entire contents.
    ///
    /// The overlap of the old and new contents is reported as changed in
    /// place; the length difference becomes a single insertion or removal.
    pub fn replace_all(&self, new_items: Vec<T>) {
        self.inner.affinity.debug_assert_owner();
        let (old, new) = {
            let mut items = self.inner.items.lock();
            let old = items.len();
            *items = new_items;
            (old, items.len())
        };
        let overlap = old.min(new);
        if overlap > 0 {
            self.inner
                .channels
                .emit_rows(ListEvent::range_changed(0, overlap));
        }
        if new > old {
            self.inner
                .channels
                .emit_rows(ListEvent::inserted(old, new - old));
        } else if old > new {
            self.inner
                .channels
                .emit_rows(ListEvent::removed(new, old - new));
        }
    }

    /// A snapshot of the current contents.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.lock().clone()
    }
}

impl<T: Clone + Send + PartialEq + 'static> VecData<T> {
    /// Remove the first occurrence of `item`. Returns whether it was found.
    pub fn remove_item(&self, item: &T) -> bool {
        self.inner.affinity.debug_assert_owner();
        let position = {
            let mut items = self.inner.items.lock();
            match items.iter().position(|existing| existing == item) {
                Some(position) => {
                    items.remove(position);
                    position
                }
                None => return false,
            }
        };
        self.inner.channels.emit_rows(ListEvent::removed(position, 1));
        true
    }
}

impl<T: Clone + Send + 'static> Data for VecData<T> {
    type Item = T;

    fn size(&self) -> usize {
        self.inner.items.lock().len()
    }

    fn get(&self, position: usize, _flags: GetFlags) -> T {
        let items = self.inner.items.lock();
        match items.get(position) {
            Some(item) => item.clone(),
            None => panic!("position {position} out of bounds (size {})", items.len()),
        }
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn available(&self) -> Available {
        Available::Exactly(0)
    }

    /// Emits a coarse change; there is nothing to reload.
    fn invalidate(&self) {
        self.inner.affinity.debug_assert_owner();
        self.inner.channels.emit_rows(ListEvent::changed());
    }

    fn refresh(&self) {
        self.invalidate();
    }

    fn reload(&self) {
        self.invalidate();
    }

    fn connect_rows(&self, slot: RowsSlot) -> ConnectionId {
        self.inner.channels.rows.connect(move |event| slot(event))
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.channels.rows.disconnect(id);
    }

    fn connect_loading(&self, slot: LoadingSlot) -> ConnectionId {
        self.inner.channels.loading.connect(move |loading| slot(loading))
    }

    fn disconnect_loading(&self, id: ConnectionId) {
        self.inner.channels.loading.disconnect(id);
    }

    fn connect_available(&self, slot: AvailableSlot) -> ConnectionId {
        self.inner
            .channels
            .available
            .connect(move |available| slot(available))
    }

    fn disconnect_available(&self, id: ConnectionId) {
        self.inner.channels.available.disconnect(id);
    }

    fn connect_error(&self, slot: ErrorSlot) -> ConnectionId {
        self.inner.channels.error.connect(move |error| slot(error))
    }

    fn disconnect_error(&self, id: ConnectionId) {
        self.inner.channels.error.disconnect(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataExt;
    use crate::test_util::Recorder;

    #[test]
    fn test_mutators_emit_exact_events() {
        let data = VecData::from(vec!["a", "b", "c"]);
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());

        data.push("d");
        data.insert(1, "x");
        data.set(0, "a2");
        data.remove(2);
        data.insert_all(4, vec!["y", "z"]);
        data.move_range(0, 2, 2);

        assert_eq!(
            recorder.take(),
            vec![
                ListEvent::inserted(3, 1),
                ListEvent::inserted(1, 1),
                ListEvent::range_changed(0, 1),
                ListEvent::removed(2, 1),
                ListEvent::inserted(4, 2),
                ListEvent::moved(0, 2, 2),
            ]
        );
        assert_eq!(data.size(), 6);
    }

    #[test]
    fn test_remove_item_first_occurrence() {
        let data = VecData::from(vec![1, 2, 2, 3]);
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());

        assert!(data.remove_item(&2));
        assert!(!data.remove_item(&9));

        assert_eq!(recorder.take(), vec![ListEvent::removed(1, 1)]);
        assert_eq!(data.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_all_overlap_events() {
        let data = VecData::from(vec![1, 2, 3]);
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());

        data.replace_all(vec![4, 5, 6, 7, 8]);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::range_changed(0, 3), ListEvent::inserted(3, 2)]
        );

        data.replace_all(vec![9]);
        assert_eq!(
            recorder.take(),
            vec![ListEvent::range_changed(0, 1), ListEvent::removed(1, 2)]
        );
    }

    #[test]
    fn test_clear_emits_single_removal() {
        let data = VecData::from(vec![1, 2, 3]);
        let recorder = Recorder::new();
        data.on_rows(recorder.rows_slot());

        data.clear();
        data.clear();

        assert_eq!(recorder.take(), vec![ListEvent::removed(0, 3)]);
        assert!(data.is_empty());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds_panics() {
        let data = VecData::from(vec![1]);
        data.item(1);
    }

    #[test]
    fn test_shadow_consistency() {
        let data = VecData::from(vec![0; 4]);
        let verifier = crate::test_util::ShadowVerifier::for_data(&data);

        data.push(1);
        data.insert_all(0, vec![2, 3]);
        data.remove(4);
        data.replace_all(vec![7, 8, 9]);
        data.clear();

        verifier.assert_consistent();
    }
}
