//! The `Data` trait and its supporting types.

use std::cmp::Ordering;

use trellis_core::ConnectionId;

use crate::data::filter::FilterData;
use crate::data::limit::LimitData;
use crate::data::offset::OffsetData;
use crate::data::sort::SortData;
use crate::data::transform::TransformData;
use crate::error::LoadError;
use crate::event::ListEvent;

/// Slot receiving rows-channel events.
pub type RowsSlot = Box<dyn Fn(&ListEvent) + Send + Sync>;
/// Slot receiving loading-channel transitions.
pub type LoadingSlot = Box<dyn Fn(&bool) + Send + Sync>;
/// Slot receiving available-channel updates.
pub type AvailableSlot = Box<dyn Fn(&Available) + Send + Sync>;
/// Slot receiving error-channel failures.
pub type ErrorSlot = Box<dyn Fn(&LoadError) + Send + Sync>;

/// Flags qualifying a [`Data::get`] call.
///
/// The presentation flag marks a get performed to render the item to the
/// user, as opposed to an internal inspection. Paged sources use it to drive
/// look-ahead loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetFlags {
    presentation: bool,
}

impl GetFlags {
    /// Flags for a presentation get.
    pub fn presentation() -> Self {
        Self { presentation: true }
    }

    /// Whether this get renders the item to the user.
    pub fn is_presentation(&self) -> bool {
        self.presentation
    }
}

/// An estimate of how many more items a source could load beyond the ones
/// it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Available {
    /// The source cannot say whether more items exist.
    Unknown,
    /// More items exist, in unknown quantity.
    More,
    /// Exactly this many more items exist. `Exactly(0)` means the source is
    /// fully loaded.
    Exactly(usize),
}

impl Available {
    /// Whether the source knows more items exist.
    ///
    /// `Unknown` reports `false`: absence of knowledge is not knowledge of
    /// more items.
    pub fn has_more(&self) -> bool {
        match *self {
            Self::Unknown => false,
            Self::More => true,
            Self::Exactly(n) => n > 0,
        }
    }

    /// Whether the source knows it is fully loaded.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Exactly(0))
    }
}

/// An observable list of items with asynchronous provenance.
///
/// A `Data` exposes its current contents synchronously (`size`/`get`) and
/// notifies changes on four independent channels:
///
/// - **rows**: [`ListEvent`]s describing content transitions
/// - **loading**: whether a load is in flight
/// - **available**: the [`Available`] estimate
/// - **error**: [`LoadError`]s from failed loads
///
/// Each channel subscribes to upstream resources lazily on its own first
/// observer and releases them with its last one. Reads are always valid,
/// observed or not; an unobserved node simply recomputes instead of caching.
///
/// Implementations are single-owner: mutating entry points and connection
/// management must happen on the owning thread. Handles are cheap clones
/// sharing the same node.
pub trait Data: Send + Sync + 'static {
    /// The item type produced by this data.
    type Item: Clone + Send + 'static;

    /// The number of items currently held.
    fn size(&self) -> usize;

    /// Get the item at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position >= size()`.
    fn get(&self, position: usize, flags: GetFlags) -> Self::Item;

    /// Whether a load is currently in flight.
    fn is_loading(&self) -> bool;

    /// How many more items could be loaded beyond the current contents.
    fn available(&self) -> Available;

    /// Mark the contents stale and schedule a clear, without loading.
    ///
    /// Takes effect when the rows channel next becomes observed. Idempotent.
    fn invalidate(&self);

    /// Mark the contents stale and start reloading now if observed, keeping
    /// the stale contents visible until the reload lands.
    fn refresh(&self);

    /// Clear the contents now, then refresh.
    fn reload(&self);

    /// Connect an observer to the rows channel.
    fn connect_rows(&self, slot: RowsSlot) -> ConnectionId;
    /// Disconnect a rows observer.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not connected.
    fn disconnect_rows(&self, id: ConnectionId);

    /// Connect an observer to the loading channel.
    fn connect_loading(&self, slot: LoadingSlot) -> ConnectionId;
    /// Disconnect a loading observer.
    fn disconnect_loading(&self, id: ConnectionId);

    /// Connect an observer to the available channel.
    fn connect_available(&self, slot: AvailableSlot) -> ConnectionId;
    /// Disconnect an available observer.
    fn disconnect_available(&self, id: ConnectionId);

    /// Connect an observer to the error channel.
    fn connect_error(&self, slot: ErrorSlot) -> ConnectionId;
    /// Disconnect an error observer.
    fn disconnect_error(&self, id: ConnectionId);

    /// Get the item at `position` with default flags.
    fn item(&self, position: usize) -> Self::Item {
        self.get(position, GetFlags::default())
    }

    /// Whether the data currently holds no items.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<D: Data + ?Sized> Data for std::sync::Arc<D> {
    type Item = D::Item;

    fn size(&self) -> usize {
        (**self).size()
    }

    fn get(&self, position: usize, flags: GetFlags) -> Self::Item {
        (**self).get(position, flags)
    }

    fn is_loading(&self) -> bool {
        (**self).is_loading()
    }

    fn available(&self) -> Available {
        (**self).available()
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }

    fn refresh(&self) {
        (**self).refresh()
    }

    fn reload(&self) {
        (**self).reload()
    }

    fn connect_rows(&self, slot: RowsSlot) -> ConnectionId {
        (**self).connect_rows(slot)
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        (**self).disconnect_rows(id)
    }

    fn connect_loading(&self, slot: LoadingSlot) -> ConnectionId {
        (**self).connect_loading(slot)
    }

    fn disconnect_loading(&self, id: ConnectionId) {
        (**self).disconnect_loading(id)
    }

    fn connect_available(&self, slot: AvailableSlot) -> ConnectionId {
        (**self).connect_available(slot)
    }

    fn disconnect_available(&self, id: ConnectionId) {
        (**self).disconnect_available(id)
    }

    fn connect_error(&self, slot: ErrorSlot) -> ConnectionId {
        (**self).connect_error(slot)
    }

    fn disconnect_error(&self, id: ConnectionId) {
        (**self).disconnect_error(id)
    }
}

/// Builder-style composition and closure sugar for [`Data`].
pub trait DataExt: Data + Sized {
    /// Keep only items matching `predicate`.
    fn filter<P>(self, predicate: P) -> FilterData<Self>
    where
        P: Fn(&Self::Item) -> bool + Send + Sync + 'static,
    {
        FilterData::new(self, predicate)
    }

    /// Reorder items by `compare`, ties broken by upstream position.
    fn sort_by<C>(self, compare: C) -> SortData<Self>
    where
        C: Fn(&Self::Item, &Self::Item) -> Ordering + Send + Sync + 'static,
    {
        SortData::new(self, compare)
    }

    /// Hide the first `offset` items.
    fn offset(self, offset: usize) -> OffsetData<Self> {
        OffsetData::new(self, offset)
    }

    /// Show at most `limit` items.
    fn limit(self, limit: usize) -> LimitData<Self> {
        LimitData::new(self, limit)
    }

    /// Map every item through `transform` on the way out.
    fn map<U, F>(self, transform: F) -> TransformData<Self, U>
    where
        U: Clone + Send + 'static,
        F: Fn(&Self::Item) -> U + Send + Sync + 'static,
    {
        TransformData::new(self, transform)
    }

    /// Connect a rows observer without boxing at the call site.
    fn on_rows<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&ListEvent) + Send + Sync + 'static,
    {
        self.connect_rows(Box::new(slot))
    }

    /// Connect a loading observer without boxing at the call site.
    fn on_loading<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.connect_loading(Box::new(slot))
    }

    /// Connect an available observer without boxing at the call site.
    fn on_available<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Available) + Send + Sync + 'static,
    {
        self.connect_available(Box::new(slot))
    }

    /// Connect an error observer without boxing at the call site.
    fn on_error<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&LoadError) + Send + Sync + 'static,
    {
        self.connect_error(Box::new(slot))
    }
}

impl<D: Data> DataExt for D {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_has_more() {
        assert!(!Available::Unknown.has_more());
        assert!(Available::More.has_more());
        assert!(Available::Exactly(3).has_more());
        assert!(!Available::Exactly(0).has_more());
    }

    #[test]
    fn test_available_complete() {
        assert!(Available::Exactly(0).is_complete());
        assert!(!Available::Exactly(1).is_complete());
        assert!(!Available::Unknown.is_complete());
        assert!(!Available::More.is_complete());
    }

    #[test]
    fn test_get_flags() {
        assert!(!GetFlags::default().is_presentation());
        assert!(GetFlags::presentation().is_presentation());
    }
}
