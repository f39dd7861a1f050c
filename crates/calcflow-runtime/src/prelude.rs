//! Prelude module for convenient imports.
//!
//! ```rust
//! use calcflow_runtime::prelude::*;
//! ```

pub use crate::engine::{
    ContextScope, Engine, EngineConfig, EngineConfigBuilder, MetaContext, NodeContext,
    NodeRunner, WorkspaceEditor,
};
pub use crate::error::{EngineError, EngineResult, RegistryError};
pub use crate::node::{ContextDefinition, NodeDescriptor, NodeOutput, NodeType};
pub use crate::registry::NodeRegistry;
pub use crate::snapshot::GraphSnapshot;
