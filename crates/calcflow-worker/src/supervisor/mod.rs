//! Calculation process supervisor.
//!
//! A calculation process executes every terminal node of a workspace and
//! records its progress and outcome through the [`ProcessRepository`]. The
//! [`CalculationSupervisor`] persists the `STARTED` process, hands it back to
//! the caller and drives the job on a background task.

mod handle;
mod job;


use std::sync::Arc;

use calcflow_core::port::{GraphRepository, ProcessRepository};
use calcflow_core::types::{CalculationProcess, StoredResult};
use calcflow_core::{ProcessId, WorkspaceId};
use calcflow_runtime::engine::NodeRunner;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub use self::handle::ProcessHandle;
use self::job::Job;
use crate::config::SupervisorConfig;
use crate::error::{Result, WorkerError};

/// Tracing target for the supervisor.
const TRACING_TARGET: &str = "calcflow_worker::supervisor";

/// Starts and tracks calculation processes.
///
/// Cheap to clone; clones share the concurrency limit and the shutdown
/// signal.
#[derive(Clone)]
pub struct CalculationSupervisor {
    runner: Arc<dyn NodeRunner>,
    graph: Arc<dyn GraphRepository>,
    processes: Arc<dyn ProcessRepository>,
    semaphore: Arc<Semaphore>,
    cancel_token: CancellationToken,
}

impl CalculationSupervisor {
    /// Creates a supervisor running terminal nodes through `runner`.
    ///
    /// `graph` is used to flag failed terminal nodes, `processes` to persist
    /// the processes and their results.
    pub fn new(
        runner: Arc<dyn NodeRunner>,
        graph: Arc<dyn GraphRepository>,
        processes: Arc<dyn ProcessRepository>,
        config: &SupervisorConfig,
    ) -> Self {
        let permits = config.permits();
        tracing::debug!(
            target: TRACING_TARGET,
            max_concurrent_processes = permits,
            "Calculation supervisor initialized"
        );

        Self {
            runner,
            graph,
            processes,
            semaphore: Arc::new(Semaphore::new(permits)),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Starts a calculation process for a workspace.
    ///
    /// Returns as soon as the `STARTED` process is persisted; the terminal
    /// nodes run on a spawned task that the returned handle can await or
    /// cancel. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the supervisor is shut down, or if the terminal nodes cannot
    /// be listed or the process cannot be persisted.
    pub async fn start_calculation(&self, workspace_id: WorkspaceId) -> Result<ProcessHandle> {
        if self.cancel_token.is_cancelled() {
            return Err(WorkerError::ShuttingDown);
        }

        let terminals = self.runner.terminal_nodes(workspace_id).await?;
        let process = self
            .processes
            .create_process(workspace_id, job::count(terminals.len()))
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            process_id = %process.id,
            workspace_id = %workspace_id,
            total_outputs = process.total_outputs,
            "Calculation process started"
        );

        let cancel_token = self.cancel_token.child_token();
        let job = Job {
            runner: self.runner.clone(),
            graph: self.graph.clone(),
            processes: self.processes.clone(),
            process: process.clone(),
            terminals,
            cancel_token: cancel_token.clone(),
        };
        let task = tokio::spawn(job.run(self.semaphore.clone()));

        Ok(ProcessHandle::new(process, cancel_token, task))
    }

    /// Starts a calculation process and waits for it to finish.
    pub async fn run_calculation(&self, workspace_id: WorkspaceId) -> Result<CalculationProcess> {
        self.start_calculation(workspace_id).await?.wait().await
    }

    /// Returns the current record of a process.
    pub async fn get_process(&self, id: ProcessId) -> Result<CalculationProcess> {
        Ok(self.processes.get_process(id).await?)
    }

    /// Lists the processes of a workspace, newest first.
    pub async fn list_processes(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<CalculationProcess>> {
        Ok(self.processes.list_processes(workspace_id).await?)
    }

    /// Lists the results stored by the terminal nodes of a workspace.
    pub async fn get_results(&self, workspace_id: WorkspaceId) -> Result<Vec<StoredResult>> {
        Ok(self.processes.get_results(workspace_id).await?)
    }

    /// Number of processes that could start running right now.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Cancels every running or queued process and rejects new ones.
    ///
    /// Affected processes are finalized as `ERROR` by their tasks.
    pub fn shutdown(&self) {
        tracing::info!(target: TRACING_TARGET, "Shutting down calculation supervisor");
        self.cancel_token.cancel();
    }

    /// Returns whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
