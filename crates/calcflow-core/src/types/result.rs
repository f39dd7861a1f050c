//! Results written back by terminal nodes.

use serde::{Deserialize, Serialize};

use super::socket::DataType;
use crate::id::{NodeId, WorkspaceId};

/// Externally consumed result of a terminal node, e.g. a number or a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResult {
    pub name: String,
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub description: String,
}

/// A persisted result, keyed by the terminal node that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub node_id: NodeId,
    #[serde(flatten)]
    pub result: OutputResult,
}
