//! Worker error types.

use calcflow_core::StoreError;
use calcflow_runtime::EngineError;

/// Result type alias for worker operations.
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Worker error type.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The engine failed to list or run terminal nodes.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Persisting the process or its results failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The task driving a process panicked or was aborted.
    #[error("process task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The supervisor no longer accepts processes.
    #[error("supervisor is shutting down")]
    ShuttingDown,
}

impl WorkerError {
    /// Returns whether the process was stopped through its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Engine(err) if err.is_cancelled())
    }
}
