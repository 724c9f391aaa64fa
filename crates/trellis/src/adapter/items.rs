//! Fixed rows built from view factories.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers, ThreadAffinity};

use crate::adapter::{Adapter, AdapterSlot, ViewHandle, ViewKind};
use crate::event::ListEvent;

type CreateFn = Arc<dyn Fn() -> ViewHandle + Send + Sync>;
type BindFn = Arc<dyn Fn(&mut ViewHandle) + Send + Sync>;

/// One fixed row: a view factory with its own kind, an optional binder, and
/// an interactivity flag.
#[derive(Clone)]
pub struct ViewItem {
    kind: ViewKind,
    create: CreateFn,
    bind: BindFn,
    interactive: bool,
}

impl ViewItem {
    /// A row whose views come from `create`.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn() -> ViewHandle + Send + Sync + 'static,
    {
        Self {
            kind: ViewKind::new(),
            create: Arc::new(create),
            bind: Arc::new(|_| {}),
            interactive: true,
        }
    }

    /// Run `bind` every time the row is bound into a view.
    pub fn on_bind<F>(mut self, bind: F) -> Self
    where
        F: Fn(&mut ViewHandle) + Send + Sync + 'static,
    {
        self.bind = Arc::new(bind);
        self
    }

    /// Mark the row non-interactive (decorative).
    pub fn decorative(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// The row's view kind.
    pub fn kind(&self) -> ViewKind {
        self.kind.clone()
    }

    pub(crate) fn create_view(&self) -> ViewHandle {
        (self.create)()
    }

    pub(crate) fn bind_into(&self, view: &mut ViewHandle) {
        (self.bind)(view)
    }

    pub(crate) fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// A fixed list of rows with per-row visibility.
///
/// The rows themselves never change; hiding and showing them is the only
/// mutation, and it emits the matching removal or insertion. Used for
/// headers, footers, empty placeholders, and loading indicators.
pub struct ItemsAdapter {
    inner: Arc<ItemsNode>,
}

struct ItemsNode {
    items: Vec<ViewItem>,
    visible: Mutex<Vec<bool>>,
    observers: Observers<ListEvent>,
    affinity: ThreadAffinity,
}

impl Clone for ItemsAdapter {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ItemsAdapter {
    /// An adapter presenting `items`, all initially visible.
    pub fn new(items: Vec<ViewItem>) -> Self {
        let visible = vec![true; items.len()];
        Self {
            inner: Arc::new(ItemsNode {
                items,
                visible: Mutex::new(visible),
                observers: Observers::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// Show or hide the item at `index` (an index into the construction
    /// list, not a row position). Idempotent.
    pub fn set_visible(&self, index: usize, visible: bool) {
        self.inner.affinity.debug_assert_owner();
        let event = {
            let mut flags = self.inner.visible.lock();
            if flags[index] == visible {
                return;
            }
            flags[index] = visible;
            let position = flags[..index].iter().filter(|&&shown| shown).count();
            if visible {
                ListEvent::inserted(position, 1)
            } else {
                ListEvent::removed(position, 1)
            }
        };
        self.inner.observers.emit(&event);
    }

    /// Show or hide every item.
    pub fn set_all_visible(&self, visible: bool) {
        for index in 0..self.inner.items.len() {
            self.set_visible(index, visible);
        }
    }

    /// Whether the item at `index` is currently shown.
    pub fn is_visible(&self, index: usize) -> bool {
        self.inner.visible.lock()[index]
    }

    fn item_at(&self, position: usize) -> &ViewItem {
        let flags = self.inner.visible.lock();
        let mut remaining = position;
        for (index, &shown) in flags.iter().enumerate() {
            if shown {
                if remaining == 0 {
                    return &self.inner.items[index];
                }
                remaining -= 1;
            }
        }
        panic!(
            "position {position} out of bounds (count {})",
            flags.iter().filter(|&&shown| shown).count()
        );
    }
}

impl Adapter for ItemsAdapter {
    fn count(&self) -> usize {
        self.inner
            .visible
            .lock()
            .iter()
            .filter(|&&shown| shown)
            .count()
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        self.item_at(position).kind()
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        self.inner
            .items
            .iter()
            .find(|item| item.kind == *kind)
            .map(|item| (item.create)())
    }

    fn bind_view(&self, position: usize, view: &mut ViewHandle) {
        (self.item_at(position).bind)(view)
    }

    fn is_interactive(&self, position: usize) -> bool {
        self.item_at(position).interactive
    }

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        self.inner.observers.connect(move |event| slot(event))
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
    }
}
