//! Graph model port.

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::id::{ConnectionId, NodeId, WorkspaceId};
use crate::types::{ConnectionInstance, ContextBoundary, NodeInstance, NodeState, SocketDef};

/// Read/write access to the node graph of workspaces.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Finds a node by id.
    async fn get_node(&self, id: NodeId) -> StoreResult<NodeInstance>;

    /// Lists every node of a workspace, including nested scopes.
    async fn get_nodes_of_workspace(&self, workspace_id: WorkspaceId)
    -> StoreResult<Vec<NodeInstance>>;

    /// Lists every connection of a workspace, including nested scopes.
    async fn get_connections_of_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<ConnectionInstance>>;

    /// Finds the boundary pseudo-node of the scope owned by `owner`.
    async fn get_context_node(
        &self,
        owner: &NodeInstance,
        boundary: ContextBoundary,
    ) -> StoreResult<NodeInstance> {
        let scope = owner.inner_context_ids();
        self.get_nodes_of_workspace(owner.workspace_id)
            .await?
            .into_iter()
            .find(|n| n.boundary() == Some(boundary) && n.context_ids == scope)
            .ok_or_else(|| {
                StoreError::not_found("context node", format!("{}/{}", owner.id, boundary))
            })
    }

    /// Stores the progress of a long-running node.
    async fn set_node_progress(&self, id: NodeId, progress: Option<f64>) -> StoreResult<()>;

    /// Stores the validation state of a node.
    async fn set_node_state(&self, id: NodeId, state: NodeState) -> StoreResult<()>;

    /// Inserts a new node.
    async fn insert_node(&self, node: NodeInstance) -> StoreResult<NodeInstance>;

    /// Inserts a connection and records it on both endpoint nodes.
    async fn insert_connection(
        &self,
        connection: ConnectionInstance,
    ) -> StoreResult<ConnectionInstance>;

    /// Removes a connection and detaches it from both endpoint nodes.
    async fn delete_connection(&self, id: ConnectionId) -> StoreResult<ConnectionInstance>;

    /// Adds or replaces a raw form value of a node.
    async fn set_form_value(&self, id: NodeId, name: &str, value: String) -> StoreResult<()>;

    /// Adds, replaces or (with `None`) removes a node variable.
    async fn set_variable(&self, id: NodeId, name: &str, def: Option<SocketDef>)
    -> StoreResult<()>;
}
