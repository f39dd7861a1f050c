//! [`ProcessRepository`] implementation.

use async_trait::async_trait;
use calcflow_core::port::ProcessRepository;
use calcflow_core::types::{CalculationProcess, ProcessPatch, StoredResult};
use calcflow_core::{ProcessId, StoreError, StoreResult, WorkspaceId};

use crate::store::{MemoryStore, TRACING_TARGET};

#[async_trait]
impl ProcessRepository for MemoryStore {
    async fn create_process(
        &self,
        workspace_id: WorkspaceId,
        total_outputs: u32,
    ) -> StoreResult<CalculationProcess> {
        let process = CalculationProcess::started(workspace_id, total_outputs);
        self.state.write().await.processes.push(process.clone());

        tracing::debug!(
            target: TRACING_TARGET,
            process_id = %process.id,
            workspace_id = %workspace_id,
            total_outputs,
            "Process created"
        );

        Ok(process)
    }

    async fn get_process(&self, id: ProcessId) -> StoreResult<CalculationProcess> {
        self.state
            .read()
            .await
            .processes
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("process", id))
    }

    async fn update_process(
        &self,
        id: ProcessId,
        patch: ProcessPatch,
    ) -> StoreResult<CalculationProcess> {
        let mut state = self.state.write().await;
        let process = state
            .processes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("process", id))?;

        if !process.apply(&patch) {
            return Err(StoreError::conflict(format!(
                "process {id} is already finished"
            )));
        }
        self.stats.record_process_update();

        Ok(process.clone())
    }

    async fn list_processes(
        &self,
        workspace_id: WorkspaceId,
    ) -> StoreResult<Vec<CalculationProcess>> {
        Ok(self
            .state
            .read()
            .await
            .processes
            .iter()
            .rev()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn add_or_update_result(&self, result: StoredResult) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.results.iter_mut().find(|r| r.node_id == result.node_id) {
            Some(existing) => *existing = result,
            None => state.results.push(result),
        }
        Ok(())
    }

    async fn get_results(&self, workspace_id: WorkspaceId) -> StoreResult<Vec<StoredResult>> {
        Ok(self
            .state
            .read()
            .await
            .results
            .iter()
            .filter(|r| r.result.workspace_id == workspace_id)
            .cloned()
            .collect())
    }
}
