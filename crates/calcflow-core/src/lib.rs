#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod id;
pub mod port;
pub mod types;

#[doc(hidden)]
pub mod prelude;

pub use error::{BoxedError, StoreError, StoreResult};
pub use id::{ConnectionId, DatasetId, EntryId, NodeId, ProcessId, WorkspaceId};
