//! Binding a data source to views.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewKind};
use crate::data::{Data, DataExt, GetFlags};
use crate::event::ListEvent;

/// How items of a data source turn into views.
///
/// A renderer owns one or more [`ViewKind`]s and knows how to create and
/// populate views of those kinds from items. The library calls it through
/// [`BoundAdapter`]; it never inspects the views itself.
pub trait Renderer<T>: Send + Sync + 'static {
    /// The kind of view `item` binds into.
    fn view_kind(&self, item: &T, position: usize) -> ViewKind;

    /// Create an unbound view of `kind`, or `None` if the kind is not one of
    /// this renderer's.
    fn create_view(&self, kind: &ViewKind) -> Option<ViewHandle>;

    /// Populate `view` from `item`.
    fn bind_view(&self, view: &mut ViewHandle, item: &T, position: usize);

    /// Whether the row for `item` responds to interaction.
    fn is_interactive(&self, item: &T, position: usize) -> bool {
        let _ = (item, position);
        true
    }

    /// A stable identity for `item`, if the renderer has one.
    fn stable_id(&self, item: &T, position: usize) -> Option<u64> {
        let _ = (item, position);
        None
    }
}

/// Presents a [`Data`] source one row per item through a [`Renderer`].
///
/// The row count is the data's size and rows events are the data's rows
/// events, unchanged. Binding reads the item with the presentation flag set,
/// so paged sources see which items actually reach the user; every other
/// read is an internal inspection. The data is observed only while the
/// adapter is.
pub struct BoundAdapter<D: Data, R> {
    inner: Arc<BoundNode<D, R>>,
}

struct BoundNode<D: Data, R> {
    data: D,
    renderer: R,
    observers: Observers<ListEvent>,
    link: Mutex<Option<ConnectionId>>,
}

impl<D: Data, R> Clone for BoundAdapter<D, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D, R> BoundAdapter<D, R>
where
    D: Data,
    R: Renderer<D::Item>,
{
    /// Bind `data` through `renderer`.
    pub fn new(data: D, renderer: R) -> Self {
        Self {
            inner: Arc::new(BoundNode {
                data,
                renderer,
                observers: Observers::new(),
                link: Mutex::new(None),
            }),
        }
    }

    /// The underlying data source.
    pub fn data(&self) -> &D {
        &self.inner.data
    }
}

impl<D, R> Adapter for BoundAdapter<D, R>
where
    D: Data,
    R: Renderer<D::Item>,
{
    fn count(&self) -> usize {
        self.inner.data.size()
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        let item = self.inner.data.item(position);
        self.inner.renderer.view_kind(&item, position)
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        self.inner.renderer.create_view(kind)
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        let item = self.inner.data.get(position, GetFlags::presentation());
        self.inner.renderer.bind_view(view, &item, position)
    }

    fn is_interactive(&self, position: usize) -> bool {
        let item = self.inner.data.item(position);
        self.inner.renderer.is_interactive(&item, position)
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        let item = self.inner.data.item(position);
        self.inner.renderer.stable_id(&item, position)
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        let first = self.inner.observers.is_empty();
        let id = self.inner.observers.connect(move |event| slot(event));
        if first {
            let weak: Weak<BoundNode<D, R>> = Arc::downgrade(&self.inner);
            *self.inner.link.lock() = Some(self.inner.data.on_rows(move |event| {
                if let Some(node) = weak.upgrade() {
                    node.observers.emit(event);
                }
            }));
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
        if self.inner.observers.is_empty() {
            if let Some(link) = self.inner.link.lock().take() {
                self.inner.data.disconnect_rows(link);
            }
        }
    }
}
