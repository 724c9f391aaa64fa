//! Data decorator mapping items through a function.

use std::sync::{Arc, Weak};

use trellis_core::ConnectionId;

use crate::data::channels::{passthrough_channels, Channels, UpstreamLink};
use crate::data::traits::{
    Available, AvailableSlot, Data, DataExt, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};

/// Presents its source with every item mapped through a function on the way
/// out.
///
/// Positions, counts, and every notification channel pass through unchanged;
/// only the item value differs. The transform runs on each `get`, so it
/// should be cheap; cache in the item type if it is not.
pub struct TransformData<S: Data, U> {
    inner: Arc<TransformNode<S, U>>,
}

struct TransformNode<S: Data, U> {
    source: S,
    transform: Box<dyn Fn(&S::Item) -> U + Send + Sync>,
    channels: Channels,
    rows_link: UpstreamLink,
    loading_link: UpstreamLink,
    available_link: UpstreamLink,
    error_link: UpstreamLink,
}

impl<S: Data, U> Clone for TransformData<S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Data, U: Clone + Send + 'static> TransformData<S, U> {
    /// Wrap `source`, mapping every item through `transform`.
    pub fn new<F>(source: S, transform: F) -> Self
    where
        F: Fn(&S::Item) -> U + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(TransformNode {
                source,
                transform: Box::new(transform),
                channels: Channels::new(),
                rows_link: UpstreamLink::new(),
                loading_link: UpstreamLink::new(),
                available_link: UpstreamLink::new(),
                error_link: UpstreamLink::new(),
            }),
        }
    }
}

impl<S: Data, U: Clone + Send + 'static> Data for TransformData<S, U> {
    type Item = U;

    fn size(&self) -> usize {
        self.inner.source.size()
    }

    fn get(&self, position: usize, flags: GetFlags) -> U {
        let item = self.inner.source.get(position, flags);
        (self.inner.transform)(&item)
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
            let weak: Weak<TransformNode<S, U>> = Arc::downgrade(&self.inner);
            self.inner.rows_link.attach(self.inner.source.on_rows(move |event| {
                if let Some(node) = weak.upgrade() {
                    node.channels.emit_rows(*event);
                }
            }));
        }
        id
    }

    fn disconnect_rows(&self, id: ConnectionId) {
        self.inner.channels.rows.disconnect(id);
        if self.inner.channels.rows.is_empty() {
            if let Some(link) = self.inner.rows_link.detach() {
                self.inner.source.disconnect_rows(link);
            }
        }
    }

    passthrough_channels!(TransformNode<S, U>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecData;
    use crate::event::ListEvent;
    use crate::test_util::Recorder;

    #[test]
    fn test_items_mapped_on_read() {
        let source = VecData::from(vec![1, 2, 3]);
        let mapped = source.clone().map(|&n| n * 10);

        assert_eq!(mapped.size(), 3);
        assert_eq!(mapped.item(0), 10);
        assert_eq!(mapped.item(2), 30);

        source.set(2, 7);
        assert_eq!(mapped.item(2), 70);
    }

    #[test]
    fn test_type_changing_transform() {
        let source = VecData::from(vec![5, 40]);
        let labels = source.map(|n| format!("#{n}"));
        assert_eq!(labels.item(1), "#40");
    }

    #[test]
    fn test_events_forwarded_unchanged() {
        let source = VecData::from(vec![1, 2, 3]);
        let mapped = source.clone().map(|&n| n + 1);
        let recorder = Recorder::new();
        mapped.on_rows(recorder.rows_slot());

        source.push(4);
        source.remove(0);
        source.move_range(0, 1, 1);

        assert_eq!(
            recorder.take(),
            vec![
                ListEvent::inserted(3, 1),
                ListEvent::removed(0, 1),
                ListEvent::moved(0, 1, 1),
            ]
        );
    }
}
