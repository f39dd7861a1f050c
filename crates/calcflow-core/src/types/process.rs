//! Calculation process records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::id::{ProcessId, WorkspaceId};

/// Lifecycle state of a calculation process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ProcessState {
    /// The job is running.
    #[default]
    Started,
    /// Every terminal node finished.
    Successful,
    /// A terminal node failed or the job was cancelled.
    Error,
}

impl ProcessState {
    /// Returns whether the state is final.
    #[inline]
    pub fn is_finished(self) -> bool {
        matches!(self, ProcessState::Successful | ProcessState::Error)
    }
}

/// A tracked execution of all terminal nodes of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationProcess {
    pub id: ProcessId,
    pub workspace_id: WorkspaceId,
    pub start: Timestamp,
    pub finish: Option<Timestamp>,
    pub state: ProcessState,
    pub processed_outputs: u32,
    pub total_outputs: u32,
}

impl CalculationProcess {
    /// Creates a freshly started process.
    pub fn started(workspace_id: WorkspaceId, total_outputs: u32) -> Self {
        Self {
            id: ProcessId::new(),
            workspace_id,
            start: Timestamp::now(),
            finish: None,
            state: ProcessState::Started,
            processed_outputs: 0,
            total_outputs,
        }
    }

    /// Returns whether the process has been finalized.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Returns the run duration in seconds once finished.
    pub fn duration_seconds(&self) -> Option<f64> {
        let finish = self.finish?;
        Some(finish.duration_since(self.start).as_secs_f64())
    }

    /// Applies a patch in place.
    ///
    /// Finished processes are immutable; patching one returns `false` and
    /// leaves it untouched.
    pub fn apply(&mut self, patch: &ProcessPatch) -> bool {
        if self.is_finished() {
            return false;
        }
        if let Some(processed) = patch.processed_outputs {
            self.processed_outputs = processed;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(finish) = patch.finish {
            self.finish = Some(finish);
        }
        true
    }
}

/// Partial update of a calculation process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessPatch {
    pub processed_outputs: Option<u32>,
    pub state: Option<ProcessState>,
    pub finish: Option<Timestamp>,
}

impl ProcessPatch {
    /// Patch recording the number of processed outputs.
    pub fn processed(count: u32) -> Self {
        Self {
            processed_outputs: Some(count),
            ..Default::default()
        }
    }

    /// Patch finalizing the process with `state` at the current time.
    pub fn finalize(state: ProcessState) -> Self {
        Self {
            state: Some(state),
            finish: Some(Timestamp::now()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_process() {
        let process = CalculationProcess::started(WorkspaceId::new(), 3);
        assert_eq!(process.state, ProcessState::Started);
        assert_eq!(process.finish, None);
        assert_eq!(process.processed_outputs, 0);
        assert_eq!(process.total_outputs, 3);
        assert!(process.duration_seconds().is_none());
    }

    #[test]
    fn test_finished_process_is_immutable() {
        let mut process = CalculationProcess::started(WorkspaceId::new(), 1);
        assert!(process.apply(&ProcessPatch::processed(1)));
        assert!(process.apply(&ProcessPatch::finalize(ProcessState::Successful)));
        assert!(process.is_finished());
        assert!(process.finish.is_some());

        assert!(!process.apply(&ProcessPatch::finalize(ProcessState::Error)));
        assert_eq!(process.state, ProcessState::Successful);
        assert_eq!(process.processed_outputs, 1);
    }
}
