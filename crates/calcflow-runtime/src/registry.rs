//! Registry of node types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use calcflow_core::types::ContextBoundary;

use crate::error::{EngineError, EngineResult, RegistryError};
use crate::node::NodeType;

/// Tracing target for registry operations.
const TRACING_TARGET: &str = "calcflow_runtime::registry";

/// Node types keyed by name.
///
/// Built once at startup and shared read-only with the engine. The reserved
/// `ContextInput` and `ContextOutput` types never resolve here; the engine
/// handles them by walking to the owning node.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    types: HashMap<String, Arc<dyn NodeType>>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type under its descriptor name.
    pub fn register(&mut self, node_type: impl NodeType + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(node_type))
    }

    /// Registers a shared node type under its descriptor name.
    pub fn register_arc(&mut self, node_type: Arc<dyn NodeType>) -> Result<(), RegistryError> {
        let name = node_type.descriptor().name.clone();
        if ContextBoundary::from_node_type(&name).is_some() {
            return Err(RegistryError::ReservedNodeType(name));
        }
        if self.types.contains_key(&name) {
            return Err(RegistryError::DuplicateNodeType(name));
        }

        tracing::trace!(
            target: TRACING_TARGET,
            node_type = %name,
            has_context = node_type.context().is_some(),
            "Node type registered"
        );

        self.types.insert(name, node_type);
        Ok(())
    }

    /// Resolves a node type by name.
    pub fn resolve(&self, name: &str) -> EngineResult<&Arc<dyn NodeType>> {
        self.types
            .get(name)
            .ok_or_else(|| EngineError::UnknownNodeType(name.to_owned()))
    }

    /// Returns whether a type is registered under `name`.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns whether `name` is a registered terminal type.
    pub fn is_output(&self, name: &str) -> bool {
        self.types
            .get(name)
            .is_some_and(|t| t.descriptor().is_output)
    }

    /// Returns the registered type names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns whether no type is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
