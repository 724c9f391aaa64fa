//! Placeholder rows driven by a data source's state.

use crate::adapter::{
    Adapter, AdapterExt, ConcatAdapter, ItemsAdapter, ViewItem,
};
use crate::data::{self, Data};

/// When the loading row is visible, relative to the data's contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadingPlacement {
    /// Only while the data holds no items.
    OnlyIfEmpty,
    /// Only while the data holds at least one item.
    OnlyIfNonEmpty,
    /// Whenever a load is in flight.
    #[default]
    Always,
}

/// Appends a placeholder row shown while a data source is empty.
///
/// The row follows the content so the content's own subscription is
/// registered first and visibility flips arrive after the content events
/// that caused them.
pub struct EmptyBuilder<A: Adapter> {
    content: A,
    item: ViewItem,
}

impl<A: Adapter> EmptyBuilder<A> {
    /// Show `item` after `content` while the data is empty.
    pub fn new(content: A, item: ViewItem) -> Self {
        Self { content, item }
    }

    /// Assemble against `data`, the source whose emptiness drives the row.
    pub fn build<D: Data + Clone>(self, data: &D) -> ConcatAdapter {
        let row = ItemsAdapter::new(vec![self.item]).show_only_while(data::is_empty(data));
        ConcatAdapter::new(vec![Box::new(self.content), Box::new(row)])
    }
}

/// Appends an indicator row shown while a data source is loading.
pub struct LoadingBuilder<A: Adapter> {
    content: A,
    item: ViewItem,
    placement: LoadingPlacement,
}

impl<A: Adapter> LoadingBuilder<A> {
    /// Show `item` after `content` while the data is loading.
    pub fn new(content: A, item: ViewItem) -> Self {
        Self {
            content,
            item,
            placement: LoadingPlacement::Always,
        }
    }

    /// Restrict when the row shows. Defaults to [`LoadingPlacement::Always`].
    pub fn placement(mut self, placement: LoadingPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Assemble against `data`, the source whose load state drives the row.
    pub fn build<D: Data + Clone>(self, data: &D) -> ConcatAdapter {
        let loading = data::is_loading(data);
        let condition = match self.placement {
            LoadingPlacement::OnlyIfEmpty => loading.and(data::is_empty(data)),
            LoadingPlacement::OnlyIfNonEmpty => loading.and(data::is_not_empty(data)),
            LoadingPlacement::Always => loading,
        };
        let row = ItemsAdapter::new(vec![self.item]).show_only_while(condition);
        ConcatAdapter::new(vec![Box::new(self.content), Box::new(row)])
    }
}
