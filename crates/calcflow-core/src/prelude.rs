//! Prelude module for convenient imports.
//!
//! ```rust
//! use calcflow_core::prelude::*;
//! ```

pub use crate::error::{StoreError, StoreResult};
pub use crate::id::{ConnectionId, DatasetId, EntryId, NodeId, ProcessId, WorkspaceId};
pub use crate::port::{DatasetRepository, GraphRepository, ProcessRepository};
pub use crate::types::{
    CalculationProcess, ConnectionInstance, ContextBoundary, DataType, DatasetRef, Form, FormExt,
    IoValues, MetaValue, NodeInstance, NodeState, OutputResult, ProcessState, SocketDef,
    SocketDefs, SocketMetas, SocketRef,
};
