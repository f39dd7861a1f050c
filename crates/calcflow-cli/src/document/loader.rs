//! Replays a document into a store.

use std::collections::BTreeMap;

use calcflow_core::port::{DatasetRepository, GraphRepository};
use calcflow_core::types::{Dataset, SocketRef};
use calcflow_core::{DatasetId, NodeId, WorkspaceId};
use calcflow_memory::MemoryStore;
use calcflow_runtime::engine::Engine;
use serde_json::Value;

use super::{
    DATASET_REFERENCE, DocumentError, DocumentResult, NodeDocument, NodeReference, SocketDocument,
    WorkspaceDocument,
};

/// Tracing target for document loading.
const TRACING_TARGET: &str = "calcflow_cli::document";

/// A document loaded into a store, with its keys resolved to ids.
#[derive(Debug, Clone)]
pub struct LoadedWorkspace {
    pub workspace_id: WorkspaceId,
    nodes: BTreeMap<String, NodeId>,
    datasets: BTreeMap<String, DatasetId>,
}

impl LoadedWorkspace {
    /// Id of the node declared under `key`.
    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    /// Id of the dataset declared under `key`.
    pub fn dataset_id(&self, key: &str) -> Option<DatasetId> {
        self.datasets.get(key).copied()
    }

    /// Document key of a node, if it was declared in the document.
    pub fn key_of(&self, node_id: NodeId) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, id)| **id == node_id)
            .map(|(key, _)| key.as_str())
    }

    /// Declared nodes ordered by key.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.nodes.iter().map(|(key, id)| (key.as_str(), *id))
    }

    fn node(&self, key: &str) -> DocumentResult<NodeId> {
        self.node_id(key)
            .ok_or_else(|| DocumentError::unknown("node", key))
    }

    /// Encodes a document form value as a raw form string.
    fn form_value(&self, value: &Value) -> DocumentResult<String> {
        if let Value::String(raw) = value
            && let Some(key) = raw.strip_prefix(DATASET_REFERENCE)
        {
            let dataset_id = self
                .dataset_id(key)
                .ok_or_else(|| DocumentError::unknown("dataset", key))?;
            return Ok(Value::String(dataset_id.to_string()).to_string());
        }
        Ok(value.to_string())
    }

    async fn socket(
        &self,
        graph: &dyn GraphRepository,
        socket: &SocketDocument,
    ) -> DocumentResult<SocketRef> {
        let node_id = match &socket.node {
            NodeReference::Key(key) => self.node(key)?,
            NodeReference::Boundary { owner, boundary } => {
                let owner = graph.get_node(self.node(owner)?).await?;
                graph.get_context_node(&owner, *boundary).await?.id
            }
        };
        Ok(SocketRef::new(node_id, socket.socket.as_str()))
    }
}

/// Creates the workspace of a document together with its datasets, nodes
/// and connections.
///
/// Items are created in document order, so context owners and datasets must
/// be declared before they are referenced.
#[tracing::instrument(
    skip_all,
    fields(workspace = %document.name),
    target = TRACING_TARGET
)]
pub async fn load_document(
    engine: &Engine,
    store: &MemoryStore,
    document: &WorkspaceDocument,
) -> DocumentResult<LoadedWorkspace> {
    let workspace = store
        .create_workspace(document.name.as_str(), document.description.as_str())
        .await;
    let mut loaded = LoadedWorkspace {
        workspace_id: workspace.id,
        nodes: BTreeMap::new(),
        datasets: BTreeMap::new(),
    };

    for dataset in &document.datasets {
        if loaded.datasets.contains_key(&dataset.key) {
            return Err(DocumentError::duplicate("dataset", dataset.key.as_str()));
        }

        let created = engine
            .datasets()
            .create_dataset(Dataset::new(dataset.name.as_str(), dataset.schema.clone()))
            .await?;
        engine
            .datasets()
            .add_entries(created.id, dataset.entries.clone())
            .await?;
        loaded.datasets.insert(dataset.key.clone(), created.id);
    }

    for node in &document.nodes {
        let node_id = create_node(engine, &loaded, node).await?;
        loaded.nodes.insert(node.key.clone(), node_id);
    }

    let editor = engine.editor();
    for connection in &document.connections {
        let from = loaded.socket(engine.graph(), &connection.from).await?;
        let to = loaded.socket(engine.graph(), &connection.to).await?;
        editor.create_connection(from, to).await?;
    }

    tracing::info!(
        target: TRACING_TARGET,
        workspace_id = %loaded.workspace_id,
        datasets = document.datasets.len(),
        nodes = document.nodes.len(),
        connections = document.connections.len(),
        "Workspace document loaded"
    );

    Ok(loaded)
}

async fn create_node(
    engine: &Engine,
    loaded: &LoadedWorkspace,
    node: &NodeDocument,
) -> DocumentResult<NodeId> {
    if loaded.nodes.contains_key(&node.key) {
        return Err(DocumentError::duplicate("node", node.key.as_str()));
    }

    let context_ids = match &node.context {
        Some(owner) => engine
            .graph()
            .get_node(loaded.node(owner)?)
            .await?
            .inner_context_ids(),
        None => Vec::new(),
    };

    let editor = engine.editor();
    let created = editor
        .create_node(&node.node_type, loaded.workspace_id, context_ids, node.x, node.y)
        .await?;

    for (name, value) in &node.form {
        editor
            .add_or_update_form_value(created.id, name, loaded.form_value(value)?)
            .await?;
    }
    for (id, variable) in &node.variables {
        editor
            .add_or_update_variable(created.id, id, &variable.name, variable.data_type)
            .await?;
    }

    tracing::debug!(
        target: TRACING_TARGET,
        key = %node.key,
        node_id = %created.id,
        node_type = %node.node_type,
        "Node loaded"
    );

    Ok(created.id)
}
