//! Workspace documents.
//!
//! A document describes one workspace: its datasets, its nodes keyed by a
//! document-local key, and the connections between their sockets. Loading
//! a document replays it through the [`WorkspaceEditor`], so every edit is
//! checked exactly like an interactive one.
//!
//! [`WorkspaceEditor`]: calcflow_runtime::engine::WorkspaceEditor

mod error;
mod loader;


use std::collections::BTreeMap;

use calcflow_core::types::{ContextBoundary, DataType, IoValues, ValueSchema};
use serde::{Deserialize, Serialize};

pub use self::error::{DocumentError, DocumentResult};
pub use self::loader::{LoadedWorkspace, load_document};

/// Prefix of form values referencing a dataset by key.
pub const DATASET_REFERENCE: &str = "@dataset:";

/// Root of a workspace document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub datasets: Vec<DatasetDocument>,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,
}

impl WorkspaceDocument {
    /// Parses a document from JSON.
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A dataset with its entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDocument {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub schema: Vec<ValueSchema>,
    #[serde(default)]
    pub entries: Vec<IoValues>,
}

/// A node placed in the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDocument {
    pub key: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Key of the context node whose scope contains this node.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub form: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableDocument>,
}

/// A user-defined input socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

/// A connection from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionDocument {
    pub from: SocketDocument,
    pub to: SocketDocument,
}

/// A socket of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketDocument {
    pub node: NodeReference,
    pub socket: String,
}

/// A node named by key, or the boundary of a context node's scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeReference {
    Key(String),
    Boundary {
        owner: String,
        boundary: ContextBoundary,
    },
}
