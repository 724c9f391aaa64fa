//! Shared fixtures for the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::adapter::{Adapter, AdapterExt, AdapterSlot, ViewHandle, ViewKind};
use crate::data::{Data, DataExt};
use crate::event::ListEvent;

/// Collects every rows event delivered to its slot, in order.
pub(crate) struct Recorder {
    events: Arc<Mutex<Vec<ListEvent>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A slot that appends each event to the recorder.
    pub(crate) fn rows_slot(&self) -> impl Fn(&ListEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event| events.lock().push(*event)
    }

    /// Drain and return everything recorded since the last call.
    pub(crate) fn take(&self) -> Vec<ListEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

/// Replays a rows channel against a shadow item count.
///
/// Each event must be applicable to the count built up from the events
/// before it: insertions land at or before the end, removals and in-place
/// changes stay in bounds, moves fit both endpoints. A coarse `Changed`
/// re-reads the count from the source. [`assert_consistent`] then checks
/// that the replayed count matches what the source reports directly.
///
/// [`assert_consistent`]: ShadowVerifier::assert_consistent
pub(crate) struct ShadowVerifier {
    shadow: Arc<Mutex<usize>>,
    actual: Box<dyn Fn() -> usize>,
}

impl ShadowVerifier {
    pub(crate) fn for_data<D: Data + Clone>(data: &D) -> Self {
        let shadow = Arc::new(Mutex::new(data.size()));
        let replayed = Arc::clone(&shadow);
        let source = data.clone();
        data.on_rows(move |event| replay(&replayed, event, || source.size()));
        let actual = data.clone();
        Self {
            shadow,
            actual: Box::new(move || actual.size()),
        }
    }

    pub(crate) fn for_adapter<A: Adapter + Clone>(adapter: &A) -> Self {
        let shadow = Arc::new(Mutex::new(adapter.count()));
        let replayed = Arc::clone(&shadow);
        let source = adapter.clone();
        adapter.on_rows(move |event| replay(&replayed, event, || source.count()));
        let actual = adapter.clone();
        Self {
            shadow,
            actual: Box::new(move || actual.count()),
        }
    }

    pub(crate) fn assert_consistent(&self) {
        assert_eq!(
            *self.shadow.lock(),
            (self.actual)(),
            "replayed count diverged from the reported count"
        );
    }
}

fn replay(shadow: &Mutex<usize>, event: &ListEvent, current: impl Fn() -> usize) {
    assert!(
        !event.is_empty_range(),
        "empty range reached an observer: {event:?}"
    );
    let mut len = shadow.lock();
    match *event {
        ListEvent::Changed => *len = current(),
        ListEvent::RangeChanged { start, count } => {
            assert!(start + count <= *len, "change out of bounds: {event:?} at {len}");
        }
        ListEvent::RangeInserted { start, count } => {
            assert!(start <= *len, "insertion out of bounds: {event:?} at {len}");
            *len += count;
        }
        ListEvent::RangeRemoved { start, count } => {
            assert!(start + count <= *len, "removal out of bounds: {event:?} at {len}");
            *len -= count;
        }
        ListEvent::RangeMoved { from, to, count } => {
            assert!(from + count <= *len, "move source out of bounds: {event:?} at {len}");
            assert!(to + count <= *len, "move target out of bounds: {event:?} at {len}");
        }
    }
}

struct StubNode {
    kind: ViewKind,
    count: Mutex<usize>,
    observers: Observers<ListEvent>,
}

/// A scriptable adapter whose rows are driven directly by the test.
///
/// All rows share one view kind and bind into unit views. The mutators
/// update the count and emit the matching event, so tests can feed a
/// decorator any inner sequence they like.
pub(crate) struct StubAdapter {
    inner: Arc<StubNode>,
}

impl Clone for StubAdapter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl StubAdapter {
    pub(crate) fn with_count(count: usize) -> Self {
        Self {
            inner: Arc::new(StubNode {
                kind: ViewKind::new(),
                count: Mutex::new(count),
                observers: Observers::new(),
            }),
        }
    }

    /// The kind every row reports.
    pub(crate) fn kind(&self) -> ViewKind {
        self.inner.kind.clone()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.inner.observers.count()
    }

    pub(crate) fn insert(&self, start: usize, count: usize) {
        {
            let mut len = self.inner.count.lock();
            assert!(start <= *len);
            *len += count;
        }
        self.emit(ListEvent::inserted(start, count));
    }

    pub(crate) fn remove(&self, start: usize, count: usize) {
        {
            let mut len = self.inner.count.lock();
            assert!(start + count <= *len);
            *len -= count;
        }
        self.emit(ListEvent::removed(start, count));
    }

    pub(crate) fn change(&self, start: usize, count: usize) {
        assert!(start + count <= *self.inner.count.lock());
        self.emit(ListEvent::range_changed(start, count));
    }

    pub(crate) fn move_range(&self, from: usize, to: usize, count: usize) {
        {
            let len = self.inner.count.lock();
            assert!(from + count <= *len);
            assert!(to + count <= *len);
        }
        self.emit(ListEvent::moved(from, to, count));
    }

    /// Replace the count wholesale and emit a coarse change.
    pub(crate) fn set_count(&self, count: usize) {
        *self.inner.count.lock() = count;
        self.inner.observers.emit(&ListEvent::changed());
    }

    fn emit(&self, event: ListEvent) {
        if !event.is_empty_range() {
            self.inner.observers.emit(&event);
        }
    }
}

impl Adapter for StubAdapter {
    fn count(&self) -> usize {
        *self.inner.count.lock()
    }

    fn view_kind(&self, position: usize) -> ViewKind {
        assert!(position < self.count());
        self.kind()
    }

    fn try_create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        (*kind == self.inner.kind).then(|| Box::new(()) as ViewHandle)
    }

    fn bind_view(&self, _position: usize, _view: &mut ViewHandle) {}

    fn connect_rows(&self, slot: AdapterSlot) -> ConnectionId {
        self.inner.observers.connect(move |event| slot(event))
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.observers.disconnect(id);
    }
}
