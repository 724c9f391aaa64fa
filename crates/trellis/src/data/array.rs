//! One-shot asynchronously loaded data source.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{
    CancellationToken, ConnectionId, Executor, OwnerQueue, ThreadAffinity,
};

use crate::data::channels::Channels;
use crate::data::traits::{
    Available, AvailableSlot, Data, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::error::LoadResult;
use crate::event::ListEvent;

type Loader<T> = Arc<dyn Fn() -> LoadResult<Vec<T>> + Send + Sync>;

/// A data source whose entire contents arrive from one background load.
///
/// The loader runs on an [`Executor`] the first time the rows channel gains
/// an observer, and again after [`refresh`](Data::refresh) or
/// [`reload`](Data::reload). Results come back through the node's
/// [`OwnerQueue`]; the owner thread must drain it (see
/// [`owner_queue`](ArrayData::owner_queue)) for them to apply.
///
/// A load in flight when the last rows observer disconnects is cancelled;
/// the source stays stale and reloads on the next activation. A failed load
/// leaves the previous contents visible, reports on the error channel, and
/// also stays stale so the next refresh retries.
pub struct ArrayData<T> {
    inner: Arc<ArrayNode<T>>,
}

struct ArrayNode<T> {
    state: Mutex<ArrayState<T>>,
    loader: Loader<T>,
    executor: Arc<dyn Executor>,
    queue: OwnerQueue,
    channels: Channels,
    affinity: ThreadAffinity,
}

struct ArrayState<T> {
    items: Vec<T>,
    loading: bool,
    /// Contents are missing or stale; the next activation (or refresh while
    /// active) starts a load.
    dirty: bool,
    /// Drop the stale contents at the next activation.
    clear_pending: bool,
    available: Available,
    /// Bumped whenever an in-flight result must be ignored.
    generation: u64,
    token: Option<CancellationToken>,
}

impl<T> Clone for ArrayData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ArrayData<T> {
    /// Create a source that loads with `loader` on the shared thread pool.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> LoadResult<Vec<T>> + Send + Sync + 'static,
    {
        Self::with_executor(loader, trellis_core::shared())
    }

    /// Create a source that loads with `loader` on `executor`.
    pub fn with_executor<F>(loader: F, executor: Arc<dyn Executor>) -> Self
    where
        F: Fn() -> LoadResult<Vec<T>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ArrayNode {
                state: Mutex::new(ArrayState {
                    items: Vec::new(),
                    loading: false,
                    dirty: true,
                    clear_pending: false,
                    available: Available::More,
                    generation: 0,
                    token: None,
                }),
                loader: Arc::new(loader),
                executor,
                queue: OwnerQueue::new(),
                channels: Channels::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// The queue results are posted to. Drain it on the owner thread to
    /// apply them; install a wake hook to learn when a drain is due.
    pub fn owner_queue(&self) -> OwnerQueue {
        self.inner.queue.clone()
    }
}

impl<T: Clone + Send + 'static> ArrayNode<T> {
    fn start_load(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.loading {
                return;
            }
            state.loading = true;
            // This load satisfies the current staleness; a refresh while it
            // is in flight re-marks dirty and `apply` starts over.
            state.dirty = false;
            state.generation += 1;
            let token = CancellationToken::new();
            state.token = Some(token.clone());

            let generation = state.generation;
            let loader = self.loader.clone();
            let queue = self.queue.clone();
            let weak = Arc::downgrade(self);
            let executor = self.executor.clone();
            drop(state);

            tracing::debug!(target: "trellis::data", "starting load");
            executor.execute(Box::new(move || {
                let result = (loader)();
                if token.is_cancelled() {
                    return;
                }
                queue.post(Box::new(move || {
                    if let Some(node) = weak.upgrade() {
                        node.apply(generation, result);
                    }
                }));
            }));
        }
        self.channels.emit_loading(true);
    }

    /// Apply a load result on the owner thread. Stale generations are
    /// dropped without effect.
    fn apply(self: &Arc<Self>, generation: u64, result: LoadResult<Vec<T>>) {
        let mut events = Vec::new();
        let mut error = None;
        let mut available = None;
        let restart = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.loading = false;
            state.token = None;
            match result {
                Ok(items) => {
                    state.clear_pending = false;
                    replace_events(&mut events, state.items.len(), items.len());
                    state.items = items;
                    state.available = Available::Exactly(0);
                    available = Some(state.available);
                }
                Err(e) => {
                    // Re-marked stale: the next refresh retries.
                    state.dirty = true;
                    error = Some(e);
                }
            }
            // A refresh during the flight re-marked dirty; honor it now.
            state.dirty && error.is_none()
        };
        // Rows first: observers deriving state from the contents (emptiness
        // conditions, placeholder rows) must see the content transition
        // before the loading edge that accompanies it.
        for event in events {
            self.channels.emit_rows(event);
        }
        self.channels.emit_loading(false);
        if let Some(available) = available {
            self.channels.emit_available(available);
        }
        if let Some(error) = error {
            self.channels.emit_error(&error);
        }
        if restart && !self.channels.rows.is_empty() {
            self.start_load();
        }
    }

    /// Abandon an in-flight load, leaving the source stale.
    fn cancel_load(&self) {
        let was_loading = {
            let mut state = self.state.lock();
            let Some(token) = state.token.take() else {
                return;
            };
            token.cancel();
            state.generation += 1;
            state.loading = false;
            state.dirty = true;
            true
        };
        if was_loading {
            self.channels.emit_loading(false);
        }
    }
}

/// Events describing a wholesale content replacement: the overlap changes in
/// place and the length difference surfaces at the tail.
fn replace_events(events: &mut Vec<ListEvent>, old: usize, new: usize) {
    let overlap = old.min(new);
    if overlap > 0 {
        events.push(ListEvent::range_changed(0, overlap));
    }
    if new > old {
        events.push(ListEvent::inserted(old, new - old));
    } else if old > new {
        events.push(ListEvent::removed(new, old - new));
    }
}

impl<T: Clone + Send + 'static> Data for ArrayData<T> {
    type Item = T;

    fn size(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    fn get(&self, position: usize, _flags: GetFlags) -> T {
        let state = self.inner.state.lock();
        match state.items.get(position) {
            Some(item) => item.clone(),
            None => panic!(
                "position {position} out of bounds (size {})",
                state.items.len()
            ),
        }
    }

    fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    fn available(&self) -> Available {
        self.inner.state.lock().available
    }

    fn invalidate(&self) {
        self.inner.affinity.debug_assert_owner();
        self.inner.cancel_load();
        let mut state = self.inner.state.lock();
        state.dirty = true;
        state.clear_pending = true;
    }

    fn refresh(&self) {
        self.inner.affinity.debug_assert_owner();
        self.inner.state.lock().dirty = true;
        if !self.inner.channels.rows.is_empty() {
            self.inner.start_load();
        }
    }

    fn reload(&self) {
        self.inner.affinity.debug_assert_owner();
        let removed = {
            let mut state = self.inner.state.lock();
            let old = state.items.len();
            state.items.clear();
            state.dirty = true;
            old
        };
        if removed > 0 {
            self.inner
                .channels
                .emit_rows(ListEvent::removed(0, removed));
        }
        if !self.inner.channels.rows.is_empty() {
            self.inner.start_load();
        }
    }

    fn connect_rows(&self, slot: RowsSlot) -> ConnectionId {
        let first = self.inner.channels.rows.is_empty();
        let id = self.inner.channels.rows.connect(move |event| slot(event));
        if first {
            let (cleared, dirty) = {
                let mut state = self.inner.state.lock();
                let cleared = if state.clear_pending {
                    state.clear_pending = false;
                    let old = state.items.len();
                    state.items.clear();
                    old
                } else {
                    0
                };
                (cleared, state.dirty)
            };
            if cleared > 0 {
                self.inner
                    .channels
                    .emit_rows(ListEvent::removed(0, cleared));
            }
            if dirty {
                self.inner.start_load();
            }
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.channels.rows.disconnect(id);
        if self.inner.channels.rows.is_empty() {
            self.inner.cancel_load();
        }
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
