//! Presentation-side composition: the `Adapter` trait and its decorators.
//!
//! An [`Adapter`] is a positioned list of *rows* ready to present: it knows
//! how many rows it has, what kind of view each row needs, and how to bind a
//! row into a view. The library never looks inside a view; embedders supply
//! view construction and binding, and everything here is pure position and
//! notification algebra.
//!
//! Adapters compose as decorators: [`ConcatAdapter`] splices several
//! adapters end to end, [`OffsetAdapter`]/[`LimitAdapter`] window one,
//! [`ConditionalAdapter`] shows one only while a [`Condition`] holds,
//! [`DividerAdapter`] interleaves divider rows, and [`TreeAdapter`] nests
//! child adapters under expandable roots. [`BoundAdapter`] is the bridge
//! from the data side.

mod bind;
mod concat;
pub(crate) mod condition;
mod conditional;
mod divider;
mod header_footer;
mod inject;
mod items;
mod limit;
mod offset;
mod tree;

use std::any::Any;
use std::sync::Arc;

use trellis_core::ConnectionId;

use crate::event::ListEvent;

pub use bind::{BoundAdapter, Renderer};
pub use concat::ConcatAdapter;
pub use condition::{BoolSlot, Condition};
pub use conditional::ConditionalAdapter;
pub use divider::{DividerAdapter, DividerBuilder, DividerEmptyPolicy};
pub use header_footer::{EmptyPolicy, HeaderFooterAdapter, HeaderFooterBuilder};
pub use inject::{EmptyBuilder, LoadingBuilder, LoadingPlacement};
pub use items::{ItemsAdapter, ViewItem};
pub use limit::LimitAdapter;
pub use offset::OffsetAdapter;
pub use tree::TreeAdapter;

/// Slot receiving an adapter's rows events.
pub type AdapterSlot = Box<dyn Fn(&ListEvent) + Send + Sync>;

/// An identity token naming a kind of view.
///
/// Kinds compare by identity: two tokens are equal only if one is a clone of
/// the other. An adapter reports a kind per row; the embedder keeps one view
/// pool per distinct kind and asks [`Adapter::create_view`] to populate it.
#[derive(Clone, Debug)]
pub struct ViewKind {
    token: Arc<()>,
}

impl ViewKind {
    /// Mint a fresh kind, distinct from every other.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            token: Arc::new(()),
        }
    }
}

impl PartialEq for ViewKind {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.token, &other.token)
    }
}

impl Eq for ViewKind {}

/// An opaque view owned by the embedder.
///
/// The library creates, routes, and binds these but never inspects them.
pub type ViewHandle = Box<dyn Any + Send>;

/// A positioned list of presentable rows.
///
/// The trait is dyn-compatible; composite adapters hold children as
/// `Box<dyn Adapter>`. A single rows channel carries [`ListEvent`]s in the
/// adapter's own position space, with the same lazy-activation contract as
/// the data side: an adapter observes its children only while it is
/// observed itself.
pub trait Adapter: Send + Sync + 'static {
    /// The number of rows.
    fn count(&self) -> usize;

    /// The kind of view row `position` binds into.
    ///
    /// # Panics
    ///
    /// Panics if `position >= count()`.
    fn view_kind(&self, position: usize) -> ViewKind;

    /// Create an unbound view of `kind`, or `None` if the kind was not
    /// minted by this adapter or one of its children. Composite adapters
    /// route the request to the child that owns the kind.
    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle>;

    /// Create an unbound view of `kind`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` was not minted by this adapter (or a child of it).
    fn create_view(&self, kind: &ViewKind) -> ViewHandle {
        match self.try_create_view(kind) {
            Some(view) => view,
            None => panic!("view kind does not belong to this adapter"),
        }
    }

    /// Bind row `position` into `view`, which was created for that row's
    /// kind.
    fn bind_view(&self, position: usize, view: &mut ViewHandle);

    /// Whether row `position` responds to interaction. Decorative rows such
    /// as dividers report `false`.
    fn is_interactive(&self, position: usize) -> bool {
        let _ = position;
        true
    }

    /// A stable identity for row `position`, if the adapter has one.
    fn stable_id(&self, position: usize) -> Option<u64> {
        let _ = position;
        None
    }

    /// Connect an observer to the rows channel.
    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId;

    /// Disconnect a rows observer.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not connected.
    fn disconnect_rows(&self, id: ConnectionId);
}

impl<A: Adapter + ?Sized> Adapter for Arc<A> {
    fn count(&self) -> usize {
        (**self).count()
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        (**self).view_kind(position)
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        (**self).try_create_view(kind)
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        (**self).bind_view(position, view)
    }

    fn is_interactive(&self, position: usize) -> bool {
        (**self).is_interactive(position)
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        (**self).stable_id(position)
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        (**self).connect_rows(slot)
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        (**self).disconnect_rows(id)
    }
}

/// Builder-style composition and closure sugar for [`Adapter`].
pub trait AdapterExt: Adapter + Sized {
    /// Hide the first `offset` rows.
    fn offset(self, offset: usize) -> OffsetAdapter<Self> {
        OffsetAdapter::new(self, offset)
    }

    /// Show at most `limit` rows.
    fn limit(self, limit: usize) -> LimitAdapter<Self> {
        LimitAdapter::new(self, limit)
    }

    /// Show this adapter only while `condition` holds.
    fn show_only_while(self, condition: Condition) -> ConditionalAdapter<Self> {
        ConditionalAdapter::new(self, condition)
    }

    /// Interleave `divider` rows, configured through the builder.
    fn dividers(self, divider: ViewItem) -> DividerBuilder<Self> {
        DividerBuilder::new(self, divider)
    }

    /// Surround this adapter with headers and footers.
    fn headers_footers(self) -> HeaderFooterBuilder<Self> {
        HeaderFooterBuilder::new(self)
    }

    /// Connect a rows observer without boxing at the call site.
    fn on_rows<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&ListEvent) + Send + Sync + 'static,
    {
        self.connect_rows(Box::new(slot))
    }
}

impl<A: Adapter + Sized> AdapterExt for A {}

/// Splice `children` end to end.
pub fn concat(children: Vec<Box<dyn Adapter>>) -> ConcatAdapter {
    ConcatAdapter::new(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_kind_identity() {
        let a = ViewKind::new();
        let b = ViewKind::new();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
