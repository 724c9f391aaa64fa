//! Notification channels shared by every data node.

use parking_lot::Mutex;
use trellis_core::{ConnectionId, Observers};

use crate::data::traits::Available;
use crate::error::LoadError;
use crate::event::ListEvent;

/// The four notification channels of a data node.
///
/// Rows carries [`ListEvent`]s; loading, available, and error carry the load
/// lifecycle. Channels are independent: each one activates upstream
/// resources on its own first observer.
pub(crate) struct Channels {
    pub rows: Observers<ListEvent>,
    pub loading: Observers<bool>,
    pub available: Observers<Available>,
    pub error: Observers<LoadError>,
}

impl Channels {
    pub fn new() -> Self {
        Self {
            rows: Observers::new(),
            loading: Observers::new(),
            available: Observers::new(),
            error: Observers::new(),
        }
    }

    /// Emit a rows event, dropping zero-length ranges.
    pub fn emit_rows(&self, event: ListEvent) {
        if event.is_empty_range() {
            return;
        }
        tracing::trace!(target: "trellis::data", ?event, "rows event");
        self.rows.emit(&event);
    }

    pub fn emit_loading(&self, loading: bool) {
        self.loading.emit(&loading);
    }

    pub fn emit_available(&self, available: Available) {
        self.available.emit(&available);
    }

    pub fn emit_error(&self, error: &LoadError) {
        tracing::warn!(target: "trellis::data", error = %error, "load failed");
        self.error.emit(error);
    }
}

/// Holder for the connection a node keeps to its upstream while one of its
/// own channels is observed.
pub(crate) struct UpstreamLink {
    id: Mutex<Option<ConnectionId>>,
}

impl UpstreamLink {
    pub fn new() -> Self {
        Self {
            id: Mutex::new(None),
        }
    }

    /// Record the upstream connection. The previous connection, if any, must
    /// have been detached first.
    pub fn attach(&self, id: ConnectionId) {
        let mut slot = self.id.lock();
        debug_assert!(slot.is_none(), "upstream link attached twice");
        *slot = Some(id);
    }

    /// Take the upstream connection for disconnection.
    pub fn detach(&self) -> Option<ConnectionId> {
        self.id.lock().take()
    }
}

/// Generates the loading, available, and error channel methods for a
/// decorator that forwards those channels from its source unchanged.
///
/// Expects the decorator handle to hold its node in `self.inner`, and the
/// node to carry `source`, `channels`, and `loading_link` /
/// `available_link` / `error_link` fields.
macro_rules! passthrough_channels {
    ($node:ty) => {
        fn connect_loading(&self, slot: LoadingSlot) -> ConnectionId {
            let first = self.inner.channels.loading.is_empty();
            let id = self
                .inner
                .channels
                .loading
                .connect(move |loading| slot(loading));
            if first {
                let weak: ::std::sync::Weak<$node> = ::std::sync::Arc::downgrade(&self.inner);
                self.inner
                    .loading_link
                    .attach(self.inner.source.on_loading(move |&loading| {
                        if let Some(node) = weak.upgrade() {
                            node.channels.emit_loading(loading);
                        }
                    }));
            }
            id
        }

        fn disconnect_loading(&self, id: ConnectionId) {
            self.inner.channels.loading.disconnect(id);
            if self.inner.channels.loading.is_empty() {
                if let Some(link) = self.inner.loading_link.detach() {
                    self.inner.source.disconnect_loading(link);
                }
            }
        }

        fn connect_available(&self, slot: AvailableSlot) -> ConnectionId {
            let first = self.inner.channels.available.is_empty();
            let id = self
                .inner
                .channels
                .available
                .connect(move |available| slot(available));
            if first {
                let weak: ::std::sync::Weak<$node> = ::std::sync::Arc::downgrade(&self.inner);
                self.inner
                    .available_link
                    .attach(self.inner.source.on_available(move |&available| {
                        if let Some(node) = weak.upgrade() {
                            node.channels.emit_available(available);
                        }
                    }));
            }
            id
        }

        fn disconnect_available(&self, id: ConnectionId) {
            self.inner.channels.available.disconnect(id);
            if self.inner.channels.available.is_empty() {
                if let Some(link) = self.inner.available_link.detach() {
                    self.inner.source.disconnect_available(link);
                }
            }
        }

        fn connect_error(&self, slot: ErrorSlot) -> ConnectionId {
            let first = self.inner.channels.error.is_empty();
            let id = self.inner.channels.error.connect(move |error| slot(error));
            if first {
                let weak: ::std::sync::Weak<$node> = ::std::sync::Arc::downgrade(&self.inner);
                self.inner
                    .error_link
                    .attach(self.inner.source.on_error(move |error| {
                        if let Some(node) = weak.upgrade() {
                            node.channels.emit_error(error);
                        }
                    }));
            }
            id
        }

        fn disconnect_error(&self, id: ConnectionId) {
            self.inner.channels.error.disconnect(id);
            if self.inner.channels.error.is_empty() {
                if let Some(link) = self.inner.error_link.detach() {
                    self.inner.source.disconnect_error(link);
                }
            }
        }
    };
}

pub(crate) use passthrough_channels;
