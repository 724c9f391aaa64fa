//! Content-side composition: the `Data` trait, sources, and decorators.
//!
//! A [`Data`] is an observable list of items with asynchronous provenance.
//! Sources produce items — [`VecData`] synchronously, [`ArrayData`] in one
//! background load, [`IncrementalData`] page by page — and decorators
//! reshape them: [`FilterData`], [`SortData`], [`OffsetData`], [`LimitData`],
//! and [`TransformData`]. Every node exposes the same four channels (rows,
//! loading, available, error) and activates upstream resources lazily, per
//! channel, on its first observer.

mod array;
mod channels;
mod conditions;
mod filter;
mod incremental;
mod limit;
mod offset;
mod sort;
mod traits;
mod transform;
mod vec_data;
pub(crate) mod window;

pub use array::ArrayData;
pub use conditions::{
    has_more_available, has_no_more_available, is_empty, is_loading, is_not_empty, is_not_loading,
};
pub use filter::FilterData;
pub use incremental::{IncrementalData, Page, Remaining};
pub use limit::LimitData;
pub use offset::OffsetData;
pub use sort::SortData;
pub use traits::{
    Available, AvailableSlot, Data, DataExt, ErrorSlot, GetFlags, LoadingSlot, RowsSlot,
};
pub use transform::TransformData;
pub use vec_data::VecData;
