//! Calculation process port.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::id::{ProcessId, WorkspaceId};
use crate::types::{CalculationProcess, ProcessPatch, StoredResult};

/// Persistence of calculation processes and the results they produce.
#[async_trait]
pub trait ProcessRepository: Send + Sync {
    /// Persists a new `STARTED` process.
    async fn create_process(
        &self,
        workspace_id: WorkspaceId,
        total_outputs: u32,
    ) -> StoreResult<CalculationProcess>;

    /// Finds a process by id.
    async fn get_process(&self, id: ProcessId) -> StoreResult<CalculationProcess>;

    /// Applies a patch, failing with a conflict if the process is finished.
    async fn update_process(
        &self,
        id: ProcessId,
        patch: ProcessPatch,
    ) -> StoreResult<CalculationProcess>;

    /// Lists the processes of a workspace, newest first.
    async fn list_processes(&self, workspace_id: WorkspaceId)
    -> StoreResult<Vec<CalculationProcess>>;

    /// Stores the result of a terminal node, replacing a previous one.
    async fn add_or_update_result(&self, result: StoredResult) -> StoreResult<()>;

    /// Lists the stored results of a workspace.
    async fn get_results(&self, workspace_id: WorkspaceId) -> StoreResult<Vec<StoredResult>>;
}
