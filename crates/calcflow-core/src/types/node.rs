//! Node instances of a workspace graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::socket::SocketDef;
use crate::id::{ConnectionId, NodeId, WorkspaceId};

/// Raw form values of a node, as entered by the user.
///
/// Every value is a string that usually holds JSON (see [`parse_form`]).
///
/// [`parse_form`]: crate::types::parse_form
pub type FormValues = BTreeMap<String, String>;

/// Validation state of a node instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum NodeState {
    /// Meta-execution considers the node runnable.
    Valid,
    /// A form value or an input is missing.
    #[default]
    Invalid,
    /// The last calculation failed while this node was a target.
    Error,
}

/// Entry or exit boundary of a nested scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContextBoundary {
    Input,
    Output,
}

impl ContextBoundary {
    /// Reserved node type of the `ContextInput` pseudo-node.
    pub const INPUT_TYPE: &'static str = "ContextInput";
    /// Reserved node type of the `ContextOutput` pseudo-node.
    pub const OUTPUT_TYPE: &'static str = "ContextOutput";

    /// Returns the reserved node type for this boundary.
    #[inline]
    pub fn node_type(self) -> &'static str {
        match self {
            Self::Input => Self::INPUT_TYPE,
            Self::Output => Self::OUTPUT_TYPE,
        }
    }

    /// Maps a node type to a boundary, if it is one of the reserved types.
    #[inline]
    pub fn from_node_type(node_type: &str) -> Option<Self> {
        match node_type {
            Self::INPUT_TYPE => Some(Self::Input),
            Self::OUTPUT_TYPE => Some(Self::Output),
            _ => None,
        }
    }
}

/// Reference from a node socket to the connection attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketValue {
    pub name: String,
    pub connection_id: ConnectionId,
}

/// A node placed in a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub workspace_id: WorkspaceId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub form: FormValues,
    #[serde(default)]
    pub inputs: Vec<SocketValue>,
    #[serde(default)]
    pub outputs: Vec<SocketValue>,
    /// Enclosing context owners, outermost first.
    #[serde(default)]
    pub context_ids: Vec<NodeId>,
    #[serde(default)]
    pub state: NodeState,
    #[serde(default)]
    pub progress: Option<f64>,
    /// User-defined input sockets keyed by variable id.
    #[serde(default)]
    pub variables: BTreeMap<String, SocketDef>,
}

impl NodeInstance {
    /// Creates a fresh, unconnected node.
    pub fn new(
        node_type: impl Into<String>,
        workspace_id: WorkspaceId,
        context_ids: Vec<NodeId>,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            workspace_id,
            x,
            y,
            form: FormValues::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            context_ids,
            state: NodeState::Invalid,
            progress: None,
            variables: BTreeMap::new(),
        }
    }

    /// Creates the boundary pseudo-node of the scope owned by `owner`.
    pub fn context_boundary(owner: &NodeInstance, boundary: ContextBoundary) -> Self {
        let mut context_ids = owner.context_ids.clone();
        context_ids.push(owner.id);
        Self::new(
            boundary.node_type(),
            owner.workspace_id,
            context_ids,
            owner.x,
            owner.y,
        )
    }

    /// Returns the boundary kind if this is a context pseudo-node.
    #[inline]
    pub fn boundary(&self) -> Option<ContextBoundary> {
        ContextBoundary::from_node_type(&self.node_type)
    }

    /// Returns whether this is a `ContextInput` or `ContextOutput` node.
    #[inline]
    pub fn is_context_boundary(&self) -> bool {
        self.boundary().is_some()
    }

    /// Returns the innermost enclosing context owner.
    #[inline]
    pub fn owner_id(&self) -> Option<NodeId> {
        self.context_ids.last().copied()
    }

    /// Returns the context ids a node inside this node's scope carries.
    pub fn inner_context_ids(&self) -> Vec<NodeId> {
        let mut ids = self.context_ids.clone();
        ids.push(self.id);
        ids
    }
}
