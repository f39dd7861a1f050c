//! [`GraphRepository`] implementation.

use async_trait::async_trait;
use calcflow_core::port::GraphRepository;
use calcflow_core::types::{ConnectionInstance, NodeInstance, NodeState, SocketDef, SocketValue};
use calcflow_core::{ConnectionId, NodeId, StoreError, StoreResult, WorkspaceId};

use crate::store::{MemoryStore, TRACING_TARGET};

#[async_trait]
impl GraphRepository for MemoryStore {
    async fn get_node(&self, id: NodeId) -> StoreResult<NodeInstance> {
        self.state
            .read()
            .await
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("node", id))
    }

    async fn get_nodes_of_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<NodeInstance>> {
        Ok(self
            .state
            .read()
            .await
            .nodes
            .iter()
            .filter(|n| n.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn get_connections_of_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<ConnectionInstance>> {
        let state = self.state.read().await;
        let connections = state
            .connections
            .iter()
            .filter(|c| {
                c.endpoints().is_some_and(|(from, _)| {
                    state
                        .nodes
                        .iter()
                        .any(|n| n.id == from.node_id && n.workspace_id == workspace_id)
                })
            })
            .cloned()
            .collect();
        Ok(connections)
    }

    async fn set_node_progress(&self, id: NodeId, progress: Option<f64>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.node_mut(id)?.progress = progress;
        self.stats.record_progress_write();
        Ok(())
    }

    async fn set_node_state(&self, id: NodeId, node_state: NodeState) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.node_mut(id)?.state = node_state;
        self.stats.record_state_write();
        Ok(())
    }

    async fn insert_node(&self, node: NodeInstance) -> StoreResult<NodeInstance> {
        let mut state = self.state.write().await;
        if state.nodes.iter().any(|n| n.id == node.id) {
            return Err(StoreError::conflict(format!("node {} already exists", node.id)));
        }
        state.touch_workspace(node.workspace_id);
        state.nodes.push(node.clone());

        tracing::trace!(
            target: TRACING_TARGET,
            node_id = %node.id,
            node_type = %node.node_type,
            "Node inserted"
        );

        Ok(node)
    }

    async fn insert_connection(
        &self,
        connection: ConnectionInstance,
    ) -> StoreResult<ConnectionInstance> {
        let Some((from, to)) = connection.endpoints() else {
            return Err(StoreError::conflict("connection endpoints must be set"));
        };
        let (from, to) = (from.clone(), to.clone());

        let mut state = self.state.write().await;
        // Validate both endpoints before mutating either.
        state.node_mut(to.node_id)?;
        state.node_mut(from.node_id)?.outputs.push(SocketValue {
            name: from.name.clone(),
            connection_id: connection.id,
        });
        let target = state.node_mut(to.node_id)?;
        target.inputs.push(SocketValue {
            name: to.name.clone(),
            connection_id: connection.id,
        });
        let workspace_id = target.workspace_id;
        state.touch_workspace(workspace_id);
        state.connections.push(connection.clone());

        Ok(connection)
    }

    async fn delete_connection(&self, id: ConnectionId) -> StoreResult<ConnectionInstance> {
        let mut state = self.state.write().await;
        let index = state
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("connection", id))?;
        let connection = state.connections.remove(index);

        for node in state.nodes.iter_mut().filter(|n| connection.touches(n.id)) {
            node.inputs.retain(|s| s.connection_id != id);
            node.outputs.retain(|s| s.connection_id != id);
        }

        Ok(connection)
    }

    async fn set_form_value(&self, id: NodeId, name: &str, value: String) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let node = state.node_mut(id)?;
        node.form.insert(name.to_owned(), value);
        let workspace_id = node.workspace_id;
        state.touch_workspace(workspace_id);
        Ok(())
    }

    async fn set_variable(
        &self,
        id: NodeId,
        name: &str,
        def: Option<SocketDef>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let node = state.node_mut(id)?;
        match def {
            Some(def) => {
                node.variables.insert(name.to_owned(), def);
            }
            None => {
                node.variables.remove(name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use calcflow_core::types::{ContextBoundary, SocketRef};

    use super::*;

    #[tokio::test]
    async fn test_insert_connection_updates_endpoints() {
        let store = MemoryStore::new();
        let ws = store.create_workspace("test", "").await;
        let a = store
            .insert_node(NodeInstance::new("A", ws.id, vec![], 0.0, 0.0))
            .await
            .unwrap();
        let b = store
            .insert_node(NodeInstance::new("B", ws.id, vec![], 0.0, 0.0))
            .await
            .unwrap();

        let connection = store
            .insert_connection(ConnectionInstance::new(
                SocketRef::new(a.id, "value"),
                SocketRef::new(b.id, "value"),
                vec![],
            ))
            .await
            .unwrap();

        let a = store.get_node(a.id).await.unwrap();
        let b = store.get_node(b.id).await.unwrap();
        assert_eq!(a.outputs[0].connection_id, connection.id);
        assert_eq!(b.inputs[0].name, "value");

        let connections = store.get_connections_of_workspace(ws.id).await.unwrap();
        assert_eq!(connections.len(), 1);

        store.delete_connection(connection.id).await.unwrap();
        assert!(store.get_node(b.id).await.unwrap().inputs.is_empty());
        assert!(store.get_connections_of_workspace(ws.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_node() {
        let store = MemoryStore::new();
        let err = store.get_node(NodeId::new()).await.unwrap_err();
        assert!(err.is_not_found());

        let err = store
            .set_node_state(NodeId::new(), NodeState::Valid)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.stats().state_writes(), 0);
    }

    #[tokio::test]
    async fn test_get_context_node() {
        let store = MemoryStore::new();
        let ws = store.create_workspace("test", "").await;
        let owner = store
            .insert_node(NodeInstance::new("Owner", ws.id, vec![], 0.0, 0.0))
            .await
            .unwrap();
        let output = store
            .insert_node(NodeInstance::context_boundary(&owner, ContextBoundary::Output))
            .await
            .unwrap();

        let found = store
            .get_context_node(&owner, ContextBoundary::Output)
            .await
            .unwrap();
        assert_eq!(found.id, output.id);

        let missing = store.get_context_node(&owner, ContextBoundary::Input).await;
        assert!(missing.unwrap_err().is_not_found());
    }
}
