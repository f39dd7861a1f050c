//! In-memory store state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use calcflow_core::types::{
    CalculationProcess, ConnectionInstance, Dataset, Entry, NodeInstance, StoredResult, Workspace,
};
use calcflow_core::{DatasetId, StoreError, StoreResult, WorkspaceId};
use tokio::sync::RwLock;

/// Tracing target for in-memory store operations.
pub(crate) const TRACING_TARGET: &str = "calcflow_memory::store";

/// Store keeping every record in process memory.
///
/// Cloning is cheap and yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub(crate) state: Arc<RwLock<StoreState>>,
    pub(crate) stats: Arc<StoreStats>,
}

/// Records grouped by kind. Vectors keep insertion order.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) workspaces: Vec<Workspace>,
    pub(crate) nodes: Vec<NodeInstance>,
    pub(crate) connections: Vec<ConnectionInstance>,
    pub(crate) datasets: HashMap<DatasetId, Dataset>,
    pub(crate) entries: HashMap<DatasetId, Vec<Entry>>,
    pub(crate) processes: Vec<CalculationProcess>,
    pub(crate) results: Vec<StoredResult>,
}

/// Counters of write operations that reached the store.
#[derive(Debug, Default)]
pub struct StoreStats {
    progress_writes: AtomicUsize,
    state_writes: AtomicUsize,
    process_updates: AtomicUsize,
}

impl StoreStats {
    pub(crate) fn record_progress_write(&self) {
        self.progress_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_state_write(&self) {
        self.state_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_process_update(&self) {
        self.process_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of node progress writes.
    pub fn progress_writes(&self) -> usize {
        self.progress_writes.load(Ordering::Relaxed)
    }

    /// Number of node state writes.
    pub fn state_writes(&self) -> usize {
        self.state_writes.load(Ordering::Relaxed)
    }

    /// Number of calculation process updates.
    pub fn process_updates(&self) -> usize {
        self.process_updates.load(Ordering::Relaxed)
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the write counters of this store.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Creates a workspace.
    pub async fn create_workspace(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Workspace {
        let workspace = Workspace::new(name, description);
        self.state.write().await.workspaces.push(workspace.clone());

        tracing::debug!(
            target: TRACING_TARGET,
            workspace_id = %workspace.id,
            name = %workspace.name,
            "Workspace created"
        );

        workspace
    }

    /// Finds a workspace by id.
    pub async fn get_workspace(&self, id: WorkspaceId) -> StoreResult<Workspace> {
        self.state
            .read()
            .await
            .workspaces
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("workspace", id))
    }

    /// Lists all workspaces.
    pub async fn list_workspaces(&self) -> Vec<Workspace> {
        self.state.read().await.workspaces.clone()
    }
}

impl StoreState {
    pub(crate) fn node_mut(
        &mut self,
        id: calcflow_core::NodeId,
    ) -> StoreResult<&mut NodeInstance> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::not_found("node", id))
    }

    pub(crate) fn touch_workspace(&mut self, id: WorkspaceId) {
        if let Some(workspace) = self.workspaces.iter_mut().find(|w| w.id == id) {
            workspace.last_change = jiff::Timestamp::now();
        }
    }
}
