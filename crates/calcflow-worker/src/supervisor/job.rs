use std::sync::Arc;

use calcflow_core::port::{GraphRepository, ProcessRepository};
use calcflow_core::types::{
    CalculationProcess, NodeInstance, NodeState, ProcessPatch, ProcessState, StoredResult,
};
use calcflow_runtime::EngineError;
use calcflow_runtime::engine::NodeRunner;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::TRACING_TARGET;
use crate::error::Result;

/// Converts a node count into a process counter.
pub(super) fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// One calculation process, owned by its task.
pub(super) struct Job {
    pub runner: Arc<dyn NodeRunner>,
    pub graph: Arc<dyn GraphRepository>,
    pub processes: Arc<dyn ProcessRepository>,
    pub process: CalculationProcess,
    pub terminals: Vec<NodeInstance>,
    pub cancel_token: CancellationToken,
}

impl Job {
    /// Waits for a free slot, runs the terminal nodes and finalizes the process.
    #[tracing::instrument(
        skip_all,
        fields(
            process_id = %self.process.id,
            workspace_id = %self.process.workspace_id,
        ),
        target = TRACING_TARGET,
        name = "calculation_process"
    )]
    pub async fn run(self, semaphore: Arc<Semaphore>) -> Result<CalculationProcess> {
        // Hold the permit until the process is finalized.
        let permit = tokio::select! {
            biased;

            () = self.cancel_token.cancelled() => None,
            permit = semaphore.acquire_owned() => permit.ok(),
        };
        let Some(_permit) = permit else {
            tracing::warn!(
                target: TRACING_TARGET,
                "Calculation process cancelled before it could start"
            );
            return self.finalize(ProcessState::Error).await;
        };

        let state = match self.run_terminals().await {
            Ok(()) => ProcessState::Successful,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Calculation process failed"
                );
                ProcessState::Error
            }
        };

        self.finalize(state).await
    }

    /// Executes the terminal nodes in order, stopping at the first failure.
    async fn run_terminals(&self) -> Result<()> {
        for (done, node) in self.terminals.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                return Err(EngineError::Cancelled.into());
            }

            tracing::debug!(
                target: TRACING_TARGET,
                node_id = %node.id,
                node_type = %node.node_type,
                "Running terminal node"
            );

            let output = match self.runner.run_node(node, &self.cancel_token).await {
                Ok(output) => output,
                Err(err) => {
                    self.mark_failed(node, &err).await;
                    return Err(err.into());
                }
            };

            if let Some(result) = output.results {
                self.processes
                    .add_or_update_result(StoredResult {
                        node_id: node.id,
                        result,
                    })
                    .await?;
            }

            self.processes
                .update_process(self.process.id, ProcessPatch::processed(count(done + 1)))
                .await?;
        }

        Ok(())
    }

    /// Flags a terminal node whose execution failed.
    async fn mark_failed(&self, node: &NodeInstance, err: &EngineError) {
        if err.is_cancelled() {
            return;
        }

        tracing::warn!(
            target: TRACING_TARGET,
            node_id = %node.id,
            error = %err,
            "Terminal node failed"
        );

        if let Err(store_err) = self.graph.set_node_state(node.id, NodeState::Error).await {
            tracing::error!(
                target: TRACING_TARGET,
                node_id = %node.id,
                error = %store_err,
                "Failed to flag terminal node"
            );
        }
    }

    async fn finalize(&self, state: ProcessState) -> Result<CalculationProcess> {
        let process = self
            .processes
            .update_process(self.process.id, ProcessPatch::finalize(state))
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            state = %process.state,
            processed_outputs = process.processed_outputs,
            total_outputs = process.total_outputs,
            duration_seconds = ?process.duration_seconds(),
            "Calculation process finished"
        );

        Ok(process)
    }
}
