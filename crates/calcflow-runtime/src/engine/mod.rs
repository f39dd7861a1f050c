//! Calculation engine.
//!
//! The [`Engine`] bundles the node registry, the repository ports and the
//! configuration, and exposes the two evaluation modes of a workspace graph:
//!
//! - meta-execution, which propagates [`MetaValue`]s symbolically to decide
//!   whether nodes are runnable
//! - execution, which computes real values of a node and everything
//!   upstream of it, memoized per run
//!
//! [`MetaValue`]: calcflow_core::types::MetaValue

mod config;
mod context;
mod editor;
mod execute;
mod meta;
mod runner;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use calcflow_core::port::{DatasetRepository, GraphRepository};
use calcflow_core::types::{
    ContextBoundary, IoValues, NodeInstance, NodeState, SocketDefs, SocketMetas,
};
use calcflow_core::{NodeId, WorkspaceId};
use tokio_util::sync::CancellationToken;

pub use self::config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use self::context::{ContextScope, MetaContext, NodeContext};
pub use self::editor::WorkspaceEditor;
use self::execute::Run;
use self::meta::MetaPass;
pub use self::runner::NodeRunner;
use crate::error::{EngineError, EngineResult};
use crate::node::{NodeOutput, NodeType};
use crate::registry::NodeRegistry;
use crate::snapshot::GraphSnapshot;

/// Tracing target for engine operations.
const TRACING_TARGET: &str = "calcflow_runtime::engine";

/// The calculation engine.
///
/// Cheap to clone; clones share the registry and the repositories.
#[derive(Clone)]
pub struct Engine {
    registry: Arc<NodeRegistry>,
    graph: Arc<dyn GraphRepository>,
    datasets: Arc<dyn DatasetRepository>,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine over the given registry and repositories.
    pub fn new(
        registry: Arc<NodeRegistry>,
        graph: Arc<dyn GraphRepository>,
        datasets: Arc<dyn DatasetRepository>,
        config: EngineConfig,
    ) -> Self {
        tracing::debug!(
            target: TRACING_TARGET,
            node_types = registry.len(),
            concurrent_inputs = config.concurrent_inputs,
            max_context_iterations = ?config.max_context_iterations,
            "Calculation engine initialized"
        );

        Self {
            registry,
            graph,
            datasets,
            config,
        }
    }

    /// Returns the node registry.
    #[inline]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Returns the graph repository.
    #[inline]
    pub fn graph(&self) -> &dyn GraphRepository {
        self.graph.as_ref()
    }

    /// Returns the dataset repository.
    #[inline]
    pub fn datasets(&self) -> &dyn DatasetRepository {
        self.datasets.as_ref()
    }

    /// Returns the engine configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns an editor for workspace mutations.
    pub fn editor(&self) -> WorkspaceEditor<'_> {
        WorkspaceEditor::new(self)
    }

    /// Loads the graph of a workspace, rejecting cyclic graphs.
    pub async fn snapshot(&self, workspace_id: WorkspaceId) -> EngineResult<GraphSnapshot> {
        let snapshot = GraphSnapshot::load(self.graph(), workspace_id).await?;
        snapshot.ensure_acyclic()?;
        Ok(snapshot)
    }

    /// Executes a stored node and everything upstream of it.
    pub async fn execute_node(&self, node_id: NodeId) -> EngineResult<NodeOutput> {
        let node = self.graph.get_node(node_id).await?;
        self.execute_node_with(&node, None, &CancellationToken::new())
            .await
    }

    /// Executes a node, optionally seeding it as a `ContextInput`.
    ///
    /// Boundary and node type checks happen before the graph is loaded, so
    /// an unknown type or an unseeded `ContextInput` fails without touching
    /// the store.
    #[tracing::instrument(
        skip(self, node, context_inputs, cancel),
        fields(node_id = %node.id, node_type = %node.node_type),
        target = TRACING_TARGET
    )]
    pub async fn execute_node_with(
        &self,
        node: &NodeInstance,
        context_inputs: Option<IoValues>,
        cancel: &CancellationToken,
    ) -> EngineResult<NodeOutput> {
        match node.boundary() {
            Some(ContextBoundary::Input) => {
                return context_inputs
                    .map(NodeOutput::new)
                    .ok_or(EngineError::ContextNeedsContextInputs { node_id: node.id });
            }
            Some(ContextBoundary::Output) => {}
            None => {
                self.registry.resolve(&node.node_type)?;
            }
        }

        let snapshot = self.snapshot(node.workspace_id).await?;
        let run = Run::new(self, &snapshot, cancel);
        let output = run.execute(node.id).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            executed_nodes = run.executed_count(),
            has_results = output.results.is_some(),
            "Node executed"
        );

        Ok(Arc::unwrap_or_clone(output))
    }

    /// Returns whether a node is runnable according to meta-execution.
    pub async fn is_node_in_meta_valid(&self, node_id: NodeId) -> EngineResult<bool> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        let node = snapshot.try_node(node_id)?;
        MetaPass::new(self, &snapshot).is_valid(node).await
    }

    /// Resolves the input metas of a node.
    pub async fn meta_inputs(&self, node_id: NodeId) -> EngineResult<SocketMetas> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        let node = snapshot.try_node(node_id)?;
        MetaPass::new(self, &snapshot).meta_inputs(node).await
    }

    /// Resolves the output metas of a node.
    pub async fn meta_outputs(&self, node_id: NodeId) -> EngineResult<SocketMetas> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        MetaPass::new(self, &snapshot).node_outputs(node_id).await
    }

    /// Returns the input socket definitions of a node.
    pub async fn input_defs(&self, node_id: NodeId) -> EngineResult<SocketDefs> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        let node = snapshot.try_node(node_id)?;
        MetaPass::new(self, &snapshot).input_defs(node).await
    }

    /// Returns the output socket definitions of a node.
    pub async fn output_defs(&self, node_id: NodeId) -> EngineResult<SocketDefs> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        let node = snapshot.try_node(node_id)?;
        MetaPass::new(self, &snapshot).output_defs(node).await
    }

    /// Returns the sockets offered inside the scope owned by `node_id`.
    ///
    /// Empty for nodes without a context.
    pub async fn context_input_defs(&self, node_id: NodeId) -> EngineResult<SocketDefs> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        let node = snapshot.try_node(node_id)?;
        MetaPass::new(self, &snapshot).context_input_defs(node).await
    }

    /// Returns the sockets expected at the exit of the scope owned by
    /// `node_id`.
    ///
    /// Empty for nodes without a context.
    pub async fn context_output_defs(&self, node_id: NodeId) -> EngineResult<SocketDefs> {
        let node = self.graph.get_node(node_id).await?;
        let snapshot = self.snapshot(node.workspace_id).await?;
        let node = snapshot.try_node(node_id)?;
        MetaPass::new(self, &snapshot).context_output_defs(node).await
    }

    /// Recomputes and persists the validity of every node of a workspace.
    ///
    /// Only changed states are written. This also clears `ERROR` flags left
    /// by a failed calculation.
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    pub async fn revalidate_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> EngineResult<BTreeMap<NodeId, NodeState>> {
        let snapshot = self.snapshot(workspace_id).await?;
        let mut pass = MetaPass::new(self, &snapshot);
        let mut states = BTreeMap::new();

        for node in snapshot.nodes() {
            let state = if pass.is_valid(node).await? {
                NodeState::Valid
            } else {
                NodeState::Invalid
            };
            if node.state != state {
                self.graph.set_node_state(node.id, state).await?;
            }
            states.insert(node.id, state);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            nodes = states.len(),
            valid = states.values().filter(|s| **s == NodeState::Valid).count(),
            "Workspace revalidated"
        );

        Ok(states)
    }

    /// Stores the progress of a node.
    ///
    /// Values outside `[0, 1]` are rejected before reaching the store.
    pub async fn set_progress(&self, node_id: NodeId, value: Option<f64>) -> EngineResult<()> {
        if let Some(value) = value
            && !(0.0..=1.0).contains(&value)
        {
            return Err(EngineError::InvalidProgressValue(value));
        }
        if !self.config.report_progress {
            return Ok(());
        }

        self.graph.set_node_progress(node_id, value).await?;
        Ok(())
    }

    /// Lists the top-level terminal nodes of a workspace in store order.
    ///
    /// Terminal types placed inside a nested scope only run as part of
    /// their owner's iterations and are skipped.
    pub async fn terminal_nodes(
        &self,
        workspace_id: WorkspaceId,
    ) -> EngineResult<Vec<NodeInstance>> {
        let nodes = self.graph.get_nodes_of_workspace(workspace_id).await?;
        Ok(nodes
            .into_iter()
            .filter(|n| n.context_ids.is_empty() && self.registry.is_output(&n.node_type))
            .collect())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Input sockets of a plain node: its type's declared inputs plus variables.
pub(crate) fn declared_inputs(node_type: &dyn NodeType, node: &NodeInstance) -> SocketDefs {
    let mut defs = node_type.descriptor().inputs.clone();
    defs.extend(
        node.variables
            .iter()
            .map(|(name, def)| (name.clone(), def.clone())),
    );
    defs
}
