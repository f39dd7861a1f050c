//! Workspace graph mutations.

use calcflow_core::types::{
    ConnectionInstance, ContextBoundary, DataType, NodeInstance, SocketDef, SocketDefs, SocketRef,
    SocketState,
};
use calcflow_core::{ConnectionId, NodeId, WorkspaceId};

use super::Engine;
use super::meta::MetaPass;
use crate::error::{EngineError, EngineResult};

/// Tracing target for workspace edits.
const TRACING_TARGET: &str = "calcflow_runtime::editor";

/// Applies edits to the graph of a workspace.
///
/// Every successful edit revalidates the whole workspace, so stored node
/// states always reflect the current graph.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceEditor<'a> {
    engine: &'a Engine,
}

impl<'a> WorkspaceEditor<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Creates a node of a registered type.
    ///
    /// Context-providing types get their `ContextInput` and `ContextOutput`
    /// pair created alongside. A non-empty `context_ids` places the node
    /// inside the scope of its last entry.
    pub async fn create_node(
        &self,
        node_type: &str,
        workspace_id: WorkspaceId,
        context_ids: Vec<NodeId>,
        x: f64,
        y: f64,
    ) -> EngineResult<NodeInstance> {
        let graph = self.engine.graph();
        let definition = self.engine.registry().resolve(node_type)?;

        if let Some(&owner_id) = context_ids.last() {
            let owner = graph.get_node(owner_id).await?;
            let owns_context = self
                .engine
                .registry()
                .resolve(&owner.node_type)
                .is_ok_and(|t| t.context().is_some());
            if !owns_context || owner.inner_context_ids() != context_ids {
                return Err(EngineError::InvalidEdit(format!(
                    "node {owner_id} does not own a context at this level"
                )));
            }
        }

        let node = graph
            .insert_node(NodeInstance::new(node_type, workspace_id, context_ids, x, y))
            .await?;
        if definition.context().is_some() {
            for boundary in [ContextBoundary::Input, ContextBoundary::Output] {
                graph
                    .insert_node(NodeInstance::context_boundary(&node, boundary))
                    .await?;
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            node_id = %node.id,
            node_type = %node.node_type,
            workspace_id = %workspace_id,
            "Node created"
        );

        self.engine.revalidate_workspace(workspace_id).await?;
        Ok(graph.get_node(node.id).await?)
    }

    /// Connects an output socket to an input socket.
    ///
    /// Both nodes must live in the same scope, the socket types must match
    /// (`CUSTOM` matches anything) and the new edge must not close a cycle.
    /// An existing connection into the same input is replaced.
    pub async fn create_connection(
        &self,
        from: SocketRef,
        to: SocketRef,
    ) -> EngineResult<ConnectionInstance> {
        let graph = self.engine.graph();
        let from_node = graph.get_node(from.node_id).await?;
        let to_node = graph.get_node(to.node_id).await?;

        if from_node.workspace_id != to_node.workspace_id {
            return Err(EngineError::InvalidConnection(
                "nodes belong to different workspaces".into(),
            ));
        }
        if from_node.context_ids != to_node.context_ids {
            return Err(EngineError::InvalidConnection(
                "nodes belong to different scopes".into(),
            ));
        }
        if from.node_id == to.node_id {
            return Err(EngineError::CyclicGraph);
        }

        let snapshot = self.engine.snapshot(from_node.workspace_id).await?;
        let mut pass = MetaPass::new(self.engine, &snapshot);
        let output_defs = pass.output_defs(snapshot.try_node(from.node_id)?).await?;
        let input_defs = pass.input_defs(snapshot.try_node(to.node_id)?).await?;

        let output = socket_type(&output_defs, &from, &from_node)?;
        let input = socket_type(&input_defs, &to, &to_node)?;
        if let (Some(output), Some(input)) = (output, input)
            && !output.can_connect_to(input)
        {
            return Err(EngineError::InvalidConnection(format!(
                "cannot connect {output} socket {} to {input} socket {}",
                from.name, to.name
            )));
        }
        if snapshot.has_path(to.node_id, from.node_id) {
            return Err(EngineError::CyclicGraph);
        }

        if let Some(existing) = snapshot.connection_into(to.node_id, &to.name) {
            graph.delete_connection(existing.id).await?;
        }
        let connection = graph
            .insert_connection(ConnectionInstance::new(
                from,
                to,
                from_node.context_ids.clone(),
            ))
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            connection_id = %connection.id,
            "Connection created"
        );

        self.engine
            .revalidate_workspace(from_node.workspace_id)
            .await?;
        Ok(connection)
    }

    /// Removes a connection.
    pub async fn delete_connection(&self, id: ConnectionId) -> EngineResult<ConnectionInstance> {
        let graph = self.engine.graph();
        let connection = graph.delete_connection(id).await?;

        if let Some(to) = &connection.to {
            let node = graph.get_node(to.node_id).await?;
            self.engine.revalidate_workspace(node.workspace_id).await?;
        }
        Ok(connection)
    }

    /// Adds or replaces a raw form value.
    pub async fn add_or_update_form_value(
        &self,
        node_id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> EngineResult<()> {
        if name.is_empty() {
            return Err(EngineError::InvalidEdit("No form value name specified".into()));
        }

        let graph = self.engine.graph();
        let node = graph.get_node(node_id).await?;
        graph.set_form_value(node_id, name, value.into()).await?;
        self.engine.revalidate_workspace(node.workspace_id).await?;
        Ok(())
    }

    /// Adds or replaces a user-defined input socket.
    pub async fn add_or_update_variable(
        &self,
        node_id: NodeId,
        variable_id: &str,
        display_name: &str,
        data_type: DataType,
    ) -> EngineResult<()> {
        if variable_id.is_empty() {
            return Err(EngineError::InvalidEdit("No variable id specified".into()));
        }

        let graph = self.engine.graph();
        let node = graph.get_node(node_id).await?;
        let def = SocketDef::new(data_type, display_name).with_state(SocketState::Variable);
        graph.set_variable(node_id, variable_id, Some(def)).await?;
        self.engine.revalidate_workspace(node.workspace_id).await?;
        Ok(())
    }

    /// Removes a variable together with the connection feeding it.
    pub async fn delete_variable(&self, node_id: NodeId, variable_id: &str) -> EngineResult<()> {
        let graph = self.engine.graph();
        let node = graph.get_node(node_id).await?;

        let feeding = graph
            .get_connections_of_workspace(node.workspace_id)
            .await?
            .into_iter()
            .find(|c| c.feeds(node_id, variable_id));
        if let Some(connection) = feeding {
            graph.delete_connection(connection.id).await?;
        }

        graph.set_variable(node_id, variable_id, None).await?;
        self.engine.revalidate_workspace(node.workspace_id).await?;
        Ok(())
    }
}

/// Looks up the type of a socket.
///
/// Boundary nodes derive their sockets from the owner's inputs, which may
/// not be connected yet, so unknown sockets are accepted there untyped.
fn socket_type(
    defs: &SocketDefs,
    socket: &SocketRef,
    node: &NodeInstance,
) -> EngineResult<Option<DataType>> {
    match defs.get(&socket.name) {
        Some(def) => Ok(Some(def.data_type)),
        None if node.is_context_boundary() => Ok(None),
        None => Err(EngineError::InvalidConnection(format!(
            "node {} has no socket {}",
            node.node_type, socket.name
        ))),
    }
}
