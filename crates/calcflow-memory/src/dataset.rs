//! [`DatasetRepository`] implementation.

use async_trait::async_trait;
use calcflow_core::port::DatasetRepository;
use calcflow_core::types::{Dataset, Entry, IoValues};
use calcflow_core::{DatasetId, EntryId, StoreError, StoreResult};

use crate::store::{MemoryStore, TRACING_TARGET};

#[async_trait]
impl DatasetRepository for MemoryStore {
    async fn get_dataset(&self, id: DatasetId) -> StoreResult<Dataset> {
        self.state
            .read()
            .await
            .datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("dataset", id))
    }

    async fn get_entries(&self, id: DatasetId) -> StoreResult<Vec<Entry>> {
        let state = self.state.read().await;
        if !state.datasets.contains_key(&id) {
            return Err(StoreError::not_found("dataset", id));
        }
        Ok(state.entries.get(&id).cloned().unwrap_or_default())
    }

    async fn create_dataset(&self, dataset: Dataset) -> StoreResult<Dataset> {
        let mut state = self.state.write().await;
        if state.datasets.contains_key(&dataset.id) {
            return Err(StoreError::conflict(format!(
                "dataset {} already exists",
                dataset.id
            )));
        }
        state.datasets.insert(dataset.id, dataset.clone());
        state.entries.insert(dataset.id, Vec::new());

        tracing::debug!(
            target: TRACING_TARGET,
            dataset_id = %dataset.id,
            name = %dataset.name,
            "Dataset created"
        );

        Ok(dataset)
    }

    async fn add_entries(&self, id: DatasetId, entries: Vec<IoValues>) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        if !state.datasets.contains_key(&id) {
            return Err(StoreError::not_found("dataset", id));
        }

        let count = entries.len();
        state.entries.entry(id).or_default().extend(entries.into_iter().map(|values| Entry {
            id: EntryId::new(),
            dataset_id: id,
            values,
        }));

        tracing::trace!(
            target: TRACING_TARGET,
            dataset_id = %id,
            count,
            "Entries added"
        );

        Ok(count)
    }
}
