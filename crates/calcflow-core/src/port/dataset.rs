//! Dataset port.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::id::DatasetId;
use crate::types::{Dataset, Entry, IoValues};

/// Access to datasets and their committed entries.
///
/// Ingestion is an external concern; the engine only reads what has been
/// committed and writes the datasets that nodes derive from it.
#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Finds a dataset by id.
    async fn get_dataset(&self, id: DatasetId) -> StoreResult<Dataset>;

    /// Returns the entries of a dataset in insertion order.
    async fn get_entries(&self, id: DatasetId) -> StoreResult<Vec<Entry>>;

    /// Stores a new dataset.
    async fn create_dataset(&self, dataset: Dataset) -> StoreResult<Dataset>;

    /// Appends entries to a dataset, returning how many were added.
    async fn add_entries(&self, id: DatasetId, entries: Vec<IoValues>) -> StoreResult<usize>;
}
