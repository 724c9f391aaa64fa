//! Composable reactive lists.
//!
//! Trellis assembles presentable lists out of two composition algebras that
//! meet in the middle:
//!
//! - The **data side** ([`data`]) models content: observable lists of items
//!   with asynchronous provenance. Sources load items — eagerly, in one
//!   background flight, or page by page — and decorators filter, sort,
//!   window, and map them. Every node speaks four channels (rows, loading,
//!   available, error) and touches upstream resources only while someone is
//!   listening.
//! - The **adapter side** ([`adapter`]) models presentation: positioned rows
//!   that know their view kind and how to bind. Decorators splice, window,
//!   gate, interleave, and nest adapters, remapping row positions and change
//!   notifications as they go.
//!
//! [`adapter::BoundAdapter`] bridges the two: give it a data source and a
//! [`adapter::Renderer`] and it becomes a row per item.
//!
//! Every change travels as a [`ListEvent`] describing the transition the
//! emitting node just completed. Observers that replay the events they
//! receive always agree with the counts the nodes report, which is what lets
//! list views apply fine-grained updates instead of rebuilding.
//!
//! # Example
//!
//! ```
//! use trellis::adapter::{Adapter, AdapterExt, BoundAdapter, Renderer, ViewHandle, ViewKind};
//! use trellis::data::{DataExt, VecData};
//!
//! struct Label {
//!     kind: ViewKind,
//! }
//!
//! impl Renderer<String> for Label {
//!     fn view_kind(&self, _item: &String, _position: usize) -> ViewKind {
//!         self.kind.clone()
//!     }
//!
//!     fn create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
//!         (*kind == self.kind).then(|| Box::new(String::new()) as ViewHandle)
//!     }
//!
//!     fn bind_view(&self, view: &mut ViewHandle, item: &String, _position: usize) {
//!         *view.downcast_mut::<String>().unwrap() = item.clone();
//!     }
//! }
//!
//! let names = VecData::new();
//! names.push("ada".to_string());
//! names.push("grace".to_string());
//!
//! let rows = BoundAdapter::new(names.clone(), Label { kind: ViewKind::new() }).limit(10);
//! rows.on_rows(|event| println!("rows changed: {event:?}"));
//!
//! assert_eq!(rows.count(), 2);
//! names.push("edsger".to_string());
//! assert_eq!(rows.count(), 3);
//! ```

pub mod adapter;
pub mod data;
mod error;
mod event;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{LoadError, LoadResult};
pub use event::ListEvent;

// The owner-thread types are half of this crate's public signatures.
pub use trellis_core::{ConnectionId, Executor, InlineExecutor, OwnerQueue};
