//! Seam between the engine and the process supervisor.

use async_trait::async_trait;
use calcflow_core::WorkspaceId;
use calcflow_core::types::NodeInstance;
use tokio_util::sync::CancellationToken;

use super::Engine;
use crate::error::EngineResult;
use crate::node::NodeOutput;

/// Runs terminal nodes on behalf of a calculation process.
#[async_trait]
pub trait NodeRunner: Send + Sync {
    /// Lists the terminal nodes of a workspace in a stable order.
    async fn terminal_nodes(&self, workspace_id: WorkspaceId) -> EngineResult<Vec<NodeInstance>>;

    /// Executes one terminal node.
    async fn run_node(
        &self,
        node: &NodeInstance,
        cancel: &CancellationToken,
    ) -> EngineResult<NodeOutput>;
}

#[async_trait]
impl NodeRunner for Engine {
    async fn terminal_nodes(&self, workspace_id: WorkspaceId) -> EngineResult<Vec<NodeInstance>> {
        Engine::terminal_nodes(self, workspace_id).await
    }

    async fn run_node(
        &self,
        node: &NodeInstance,
        cancel: &CancellationToken,
    ) -> EngineResult<NodeOutput> {
        self.execute_node_with(node, None, cancel).await
    }
}
