//! Handle to a spawned calculation process.

use calcflow_core::ProcessId;
use calcflow_core::types::CalculationProcess;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Handle returned by [`CalculationSupervisor::start_calculation`].
///
/// Dropping the handle detaches the job; it keeps running to completion.
///
/// [`CalculationSupervisor::start_calculation`]: super::CalculationSupervisor::start_calculation
#[derive(Debug)]
pub struct ProcessHandle {
    process: CalculationProcess,
    cancel_token: CancellationToken,
    task: JoinHandle<Result<CalculationProcess>>,
}

impl ProcessHandle {
    pub(super) fn new(
        process: CalculationProcess,
        cancel_token: CancellationToken,
        task: JoinHandle<Result<CalculationProcess>>,
    ) -> Self {
        Self {
            process,
            cancel_token,
            task,
        }
    }

    /// The process as it was persisted when the job started.
    pub fn process(&self) -> &CalculationProcess {
        &self.process
    }

    /// Id of the process.
    pub fn id(&self) -> ProcessId {
        self.process.id
    }

    /// Requests cancellation; the process is finalized as `ERROR`.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Returns whether the job has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the job and returns the finalized process.
    pub async fn wait(self) -> Result<CalculationProcess> {
        self.task.await?
    }
}
