//! Incrementally loaded data source backed by a worker thread.

use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};
use trellis_core::{ConnectionId, OwnerQueue, ThreadAffinity};

use crate::data::channels::Channels;
use crate::data::traits::{
    Available, AvailableSlot, Data, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
use crate::error::LoadResult;
use crate::event::ListEvent;

/// How many items past the last presented position to keep loaded ahead.
const LOOK_AHEAD: usize = 5;

/// One batch of items produced by an incremental loader.
pub struct Page<T> {
    /// The items to append.
    pub items: Vec<T>,
    /// How many more items the source could produce after these.
    pub remaining: Remaining,
}

/// What an incremental loader knows about the items it has not produced yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// The loader cannot say.
    Unknown,
    /// More pages exist, in unknown quantity.
    More,
    /// Exactly this many items are left. `Exactly(0)` ends loading for good.
    Exactly(usize),
}

impl Remaining {
    fn to_available(self) -> Available {
        match self {
            Self::Unknown => Available::Unknown,
            Self::More => Available::More,
            Self::Exactly(n) => Available::Exactly(n),
        }
    }
}

type Loader<T> = Box<dyn FnMut(usize) -> LoadResult<Page<T>> + Send>;

/// A data source that loads pages on demand from a dedicated worker thread.
///
/// The loader is called with the number of items loaded so far and returns
/// the next [`Page`]. The worker starts on the first rows observer and loads
/// until it is [`LOOK_AHEAD`] items ahead of the last position read with
/// [`GetFlags::presentation`], then parks. Presenting positions near the
/// loaded edge wakes it again, so scrolling pulls pages in as needed.
///
/// The worker parks for good when a page reports [`Remaining::Exactly`]`(0)`.
/// A failed page halts loading until [`refresh`](Data::refresh), which
/// retries from where it stopped. [`reload`](Data::reload) drops everything
/// and starts over from zero. Losing the last rows observer leaves the
/// worker parked with its progress intact.
///
/// Results come back through the node's [`OwnerQueue`]; drain it on the
/// owner thread to apply them.
pub struct IncrementalData<T> {
    inner: Arc<IncrementalNode<T>>,
}

struct IncrementalNode<T> {
    state: Mutex<IncrementalState<T>>,
    worker: Arc<WorkerShared>,
    /// Taken by the worker thread when it is first spawned.
    loader: Mutex<Option<Loader<T>>>,
    queue: OwnerQueue,
    channels: Channels,
    affinity: ThreadAffinity,
}

struct IncrementalState<T> {
    items: Vec<T>,
    loading: bool,
    available: Available,
    spawned: bool,
    /// Drop the contents and start over at the next activation.
    clear_pending: bool,
}

/// State shared with the worker thread.
struct WorkerShared {
    state: Mutex<WorkerState>,
    condvar: Condvar,
}

struct WorkerState {
    /// Load until at least this many items are held.
    target: usize,
    /// Items produced so far in the current epoch.
    loaded: usize,
    /// Bumped by reload; results from older epochs are discarded.
    epoch: u64,
    /// Set on load failure; cleared by refresh.
    halted: bool,
    /// Set when a page reports nothing remaining.
    complete: bool,
    /// Set when the node is dropped.
    stop: bool,
}

impl<T> Clone for IncrementalData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Drop for IncrementalNode<T> {
    fn drop(&mut self) {
        self.worker.state.lock().stop = true;
        self.worker.condvar.notify_all();
    }
}

impl<T: Clone + Send + 'static> IncrementalData<T> {
    /// Create a source fed by `loader`, which receives the number of items
    /// loaded so far and returns the next page.
    pub fn new<F>(loader: F) -> Self
    where
        F: FnMut(usize) -> LoadResult<Page<T>> + Send + 'static,
    {
        Self {
            inner: Arc::new(IncrementalNode {
                state: Mutex::new(IncrementalState {
                    items: Vec::new(),
                    loading: false,
                    available: Available::Unknown,
                    spawned: false,
                    clear_pending: false,
                }),
                worker: Arc::new(WorkerShared {
                    state: Mutex::new(WorkerState {
                        target: 0,
                        loaded: 0,
                        epoch: 0,
                        halted: false,
                        complete: false,
                        stop: false,
                    }),
                    condvar: Condvar::new(),
                }),
                loader: Mutex::new(Some(Box::new(loader))),
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

impl<T: Clone + Send + 'static> IncrementalNode<T> {
    fn spawn_worker(self: &Arc<Self>) {
        let Some(loader) = self.loader.lock().take() else {
            return;
        };
        let worker = self.worker.clone();
        let queue = self.queue.clone();
        let weak = Arc::downgrade(self);
        let spawned = std::thread::Builder::new()
            .name("trellis-incremental".to_string())
            .spawn(move || worker_loop(worker, loader, queue, weak));
        if let Err(error) = spawned {
            tracing::error!(target: "trellis::data", %error, "failed to spawn loader thread");
        }
    }

    /// Raise the load target, waking the worker if it leaves it behind.
    fn request(self: &Arc<Self>, want: usize) {
        let wake = {
            let mut worker = self.worker.state.lock();
            if worker.complete || worker.halted || want <= worker.target {
                false
            } else {
                worker.target = want;
                worker.loaded < want
            }
        };
        if wake {
            self.worker.condvar.notify_one();
            self.set_loading(true);
        }
    }

    fn set_loading(&self, loading: bool) {
        let changed = {
            let mut state = self.state.lock();
            if state.loading == loading {
                false
            } else {
                state.loading = loading;
                true
            }
        };
        if changed {
            self.channels.emit_loading(loading);
        }
    }

    /// Apply a page result on the owner thread. Results from an earlier
    /// epoch are dropped.
    fn apply(&self, epoch: u64, result: LoadResult<Page<T>>) {
        let caught_up = {
            let worker = self.worker.state.lock();
            if worker.epoch != epoch {
                return;
            }
            worker.complete || worker.halted || worker.loaded >= worker.target
        };
        match result {
            Ok(page) => {
                let (start, count, available) = {
                    let mut state = self.state.lock();
                    let start = state.items.len();
                    let count = page.items.len();
                    state.items.extend(page.items);
                    state.available = page.remaining.to_available();
                    (start, count, state.available)
                };
                if count > 0 {
                    self.channels.emit_rows(ListEvent::inserted(start, count));
                }
                self.channels.emit_available(available);
                if caught_up {
                    self.set_loading(false);
                }
            }
            Err(error) => {
                self.set_loading(false);
                self.channels.emit_error(&error);
            }
        }
    }

    /// Drop all contents and restart loading from zero.
    fn restart(self: &Arc<Self>) {
        let removed = {
            let mut state = self.state.lock();
            let old = state.items.len();
            state.items.clear();
            state.available = Available::Unknown;
            old
        };
        {
            let mut worker = self.worker.state.lock();
            worker.epoch += 1;
            worker.loaded = 0;
            worker.target = LOOK_AHEAD;
            worker.halted = false;
            worker.complete = false;
        }
        if removed > 0 {
            self.channels.emit_rows(ListEvent::removed(0, removed));
        }
        self.worker.condvar.notify_one();
        self.set_loading(true);
    }
}

fn worker_loop<T: Clone + Send + 'static>(
    worker: Arc<WorkerShared>,
    mut loader: Loader<T>,
    queue: OwnerQueue,
    node: Weak<IncrementalNode<T>>,
) {
    loop {
        let (loaded, epoch) = {
            let mut state = worker.state.lock();
            while !state.stop
                && (state.halted || state.complete || state.loaded >= state.target)
            {
                worker.condvar.wait(&mut state);
            }
            if state.stop {
                return;
            }
            (state.loaded, state.epoch)
        };

        let result = loader(loaded);

        {
            let mut state = worker.state.lock();
            if state.stop {
                return;
            }
            if state.epoch != epoch {
                // A reload ran while this page was in flight; throw the
                // page away and loop back around for the new epoch.
                continue;
            }
            match &result {
                Ok(page) => {
                    state.loaded += page.items.len();
                    if matches!(page.remaining, Remaining::Exactly(0)) {
                        // Parks until a reload opens a new epoch.
                        state.complete = true;
                        tracing::debug!(target: "trellis::data", "incremental load complete");
                    } else if page.items.is_empty() {
                        // An empty page with more remaining would spin; halt
                        // until a refresh.
                        state.halted = true;
                    }
                }
                Err(_) => state.halted = true,
            }
        }

        let node = node.clone();
        queue.post(Box::new(move || {
            if let Some(node) = node.upgrade() {
                node.apply(epoch, result);
            }
        }));
    }
}

impl<T: Clone + Send + 'static> Data for IncrementalData<T> {
    type Item = T;

    fn size(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    fn get(&self, position: usize, flags: GetFlags) -> T {
        let item = {
            let state = self.inner.state.lock();
            match state.items.get(position) {
                Some(item) => item.clone(),
                None => panic!(
                    "position {position} out of bounds (size {})",
                    state.items.len()
                ),
            }
        };
        if flags.is_presentation() {
            self.inner.request(position + 1 + LOOK_AHEAD);
        }
        item
    }

    fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    fn available(&self) -> Available {
        self.inner.state.lock().available
    }

    fn invalidate(&self) {
        self.inner.affinity.debug_assert_owner();
        self.inner.state.lock().clear_pending = true;
    }

    fn refresh(&self) {
        self.inner.affinity.debug_assert_owner();
        let resume = {
            let mut worker = self.inner.worker.state.lock();
            if worker.halted {
                worker.halted = false;
                worker.loaded < worker.target
            } else {
                false
            }
        };
        if resume {
            self.inner.worker.condvar.notify_one();
            self.inner.set_loading(true);
        }
    }

    fn reload(&self) {
        self.inner.affinity.debug_assert_owner();
        self.inner.restart();
    }

    fn connect_rows(&self, slot: RowsSlot) -> ConnectionId {
        let first = self.inner.channels.rows.is_empty();
        let id = self.inner.channels.rows.connect(move |event| slot(event));
        if first {
            let (spawn, clear) = {
                let mut state = self.inner.state.lock();
                let spawn = !state.spawned;
                state.spawned = true;
                let clear = state.clear_pending;
                state.clear_pending = false;
                (spawn, clear)
            };
            if spawn {
                self.inner.spawn_worker();
            }
            if clear {
                self.inner.restart();
            } else {
                let want = self.size() + LOOK_AHEAD;
                self.inner.request(want);
            }
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.channels.rows.disconnect(id);
        // The worker keeps its progress; it is already parked or will park
        // once it reaches the current target.
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
