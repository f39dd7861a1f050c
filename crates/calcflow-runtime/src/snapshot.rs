//! Read-only view of a workspace graph.

use std::collections::{BTreeMap, HashMap};

use calcflow_core::port::GraphRepository;
use calcflow_core::types::{ConnectionInstance, ContextBoundary, NodeInstance, SocketRef};
use calcflow_core::{NodeId, StoreError, StoreResult, WorkspaceId};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{EngineError, EngineResult};

/// Nodes and connections of one workspace, loaded once per run.
///
/// Traversal never touches the store; state transitions are written back by
/// the engine separately.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    workspace_id: WorkspaceId,
    nodes: HashMap<NodeId, NodeInstance>,
    order: Vec<NodeId>,
    /// Feeding socket keyed by target node and input socket name.
    inbound: HashMap<NodeId, BTreeMap<String, SocketRef>>,
    connections: Vec<ConnectionInstance>,
    graph: DiGraph<NodeId, ()>,
    indices: HashMap<NodeId, NodeIndex>,
}

impl GraphSnapshot {
    /// Loads the graph of a workspace.
    pub async fn load(
        repository: &dyn GraphRepository,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Self> {
        let nodes = repository.get_nodes_of_workspace(workspace_id).await?;
        let connections = repository.get_connections_of_workspace(workspace_id).await?;
        Ok(Self::from_parts(workspace_id, nodes, connections))
    }

    /// Builds a snapshot from already loaded records.
    ///
    /// Besides the explicit connections, every `ContextOutput` gets an edge
    /// to its owner since the owner consumes the nested scope.
    pub fn from_parts(
        workspace_id: WorkspaceId,
        nodes: Vec<NodeInstance>,
        connections: Vec<ConnectionInstance>,
    ) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), connections.len());
        let mut indices = HashMap::with_capacity(nodes.len());
        let mut order = Vec::with_capacity(nodes.len());
        for node in &nodes {
            indices.insert(node.id, graph.add_node(node.id));
            order.push(node.id);
        }

        let mut inbound: HashMap<NodeId, BTreeMap<String, SocketRef>> = HashMap::new();
        for (from, to) in connections.iter().filter_map(ConnectionInstance::endpoints) {
            inbound
                .entry(to.node_id)
                .or_default()
                .insert(to.name.clone(), from.clone());
            if let (Some(&a), Some(&b)) = (indices.get(&from.node_id), indices.get(&to.node_id)) {
                graph.update_edge(a, b, ());
            }
        }

        for node in nodes.iter().filter(|n| n.boundary() == Some(ContextBoundary::Output)) {
            let owner = node.owner_id().and_then(|id| indices.get(&id));
            if let (Some(&a), Some(&b)) = (indices.get(&node.id), owner) {
                graph.update_edge(a, b, ());
            }
        }

        Self {
            workspace_id,
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            order,
            inbound,
            connections,
            graph,
            indices,
        }
    }

    /// Returns the workspace this snapshot was taken from.
    #[inline]
    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Returns a node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&NodeInstance> {
        self.nodes.get(&id)
    }

    /// Returns a node by id, failing if it is not part of the workspace.
    pub fn try_node(&self, id: NodeId) -> EngineResult<&NodeInstance> {
        self.node(id)
            .ok_or_else(|| StoreError::not_found("node", id).into())
    }

    /// Returns every node in store order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInstance> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Returns every connection.
    #[inline]
    pub fn connections(&self) -> &[ConnectionInstance] {
        &self.connections
    }

    /// Returns the number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Returns the output socket feeding the given input socket.
    pub fn source_of(&self, node_id: NodeId, socket: &str) -> Option<&SocketRef> {
        self.inbound.get(&node_id)?.get(socket)
    }

    /// Returns every connected input socket of a node with its source.
    pub fn inbound(&self, node_id: NodeId) -> impl Iterator<Item = (&str, &SocketRef)> {
        self.inbound
            .get(&node_id)
            .into_iter()
            .flat_map(|sockets| sockets.iter().map(|(name, from)| (name.as_str(), from)))
    }

    /// Returns the connection feeding the given input socket.
    pub fn connection_into(&self, node_id: NodeId, socket: &str) -> Option<&ConnectionInstance> {
        self.connections.iter().find(|c| c.feeds(node_id, socket))
    }

    /// Returns the node owning the scope of a boundary node.
    pub fn owner_of(&self, node: &NodeInstance) -> EngineResult<&NodeInstance> {
        let owner_id = node
            .owner_id()
            .ok_or(EngineError::NodeHasNoContext { node_id: node.id })?;
        self.try_node(owner_id)
    }

    /// Returns the boundary node of the scope owned by `owner`.
    pub fn context_node(
        &self,
        owner: &NodeInstance,
        boundary: ContextBoundary,
    ) -> EngineResult<&NodeInstance> {
        let scope = owner.inner_context_ids();
        self.nodes()
            .find(|n| n.boundary() == Some(boundary) && n.context_ids == scope)
            .ok_or(EngineError::UnknownContextNode {
                owner_id: owner.id,
                boundary,
            })
    }

    /// Returns whether the graph contains a cycle.
    pub fn is_cyclic(&self) -> bool {
        algo::is_cyclic_directed(&self.graph)
    }

    /// Fails with [`EngineError::CyclicGraph`] if the graph contains a cycle.
    pub fn ensure_acyclic(&self) -> EngineResult<()> {
        if self.is_cyclic() {
            return Err(EngineError::CyclicGraph);
        }
        Ok(())
    }

    /// Returns whether `to` is reachable from `from` along connections.
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        match (self.indices.get(&from), self.indices.get(&to)) {
            (Some(&a), Some(&b)) => algo::has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }
}
