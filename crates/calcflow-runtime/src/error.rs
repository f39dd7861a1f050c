//! Engine error types.

use calcflow_core::types::ContextBoundary;
use calcflow_core::{NodeId, StoreError};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while building a [`NodeRegistry`].
///
/// [`NodeRegistry`]: crate::registry::NodeRegistry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A node type with the same name is already registered.
    #[error("node type {0} is already registered")]
    DuplicateNodeType(String),

    /// The name is reserved for context boundary nodes.
    #[error("node type {0} is reserved")]
    ReservedNodeType(String),
}

/// Errors that can occur while validating, executing or editing a graph.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No node type is registered under this name.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A form value or an input of the node is missing or invalid.
    #[error("Form values or inputs are missing")]
    FormOrInputsMissing {
        /// Node that could not run.
        node_id: NodeId,
    },

    /// The node called its context function without having one.
    #[error("Missing context function")]
    MissingContextFunction {
        /// Node that requested the nested scope.
        node_id: NodeId,
    },

    /// A `ContextInput` node ran without seed values.
    #[error("Context needs context inputs")]
    ContextNeedsContextInputs {
        /// The `ContextInput` node.
        node_id: NodeId,
    },

    /// A boundary node does not belong to any context.
    #[error("Node doesnt have context")]
    NodeHasNoContext {
        /// The orphaned node.
        node_id: NodeId,
    },

    /// A context owner is missing one of its boundary nodes.
    #[error("Unknown context node")]
    UnknownContextNode {
        /// Node owning the nested scope.
        owner_id: NodeId,
        /// Boundary that could not be found.
        boundary: ContextBoundary,
    },

    /// Progress must lie within `[0, 1]`.
    #[error("Invalid progress value: {0}")]
    InvalidProgressValue(f64),

    /// A context ran more iterations than configured.
    #[error("context of node {node_id} exceeded {limit} iterations")]
    ContextIterationLimit {
        /// Node owning the nested scope.
        node_id: NodeId,
        /// Configured maximum.
        limit: usize,
    },

    /// The workspace graph contains a cycle.
    #[error("workspace graph contains a cycle")]
    CyclicGraph,

    /// A connection is not allowed between the given sockets.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// An edit request is malformed.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    /// The run was cancelled.
    #[error("execution cancelled")]
    Cancelled,

    /// A node type raised an error while executing.
    #[error("node {node_id} failed: {message}")]
    NodeFailed {
        /// Node that failed.
        node_id: NodeId,
        /// Error message.
        message: String,
    },

    /// A repository call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Creates a failure raised by a node type.
    pub fn node_failed(node_id: NodeId, message: impl Into<String>) -> Self {
        Self::NodeFailed {
            node_id,
            message: message.into(),
        }
    }

    /// Returns whether the error was caused by cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
