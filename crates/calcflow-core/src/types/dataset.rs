//! Datasets consumed and produced by dataset nodes.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::socket::{DataType, IoValues};
use crate::id::{DatasetId, EntryId};

/// Column definition of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub fallback: String,
}

impl ValueSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: true,
            unique: false,
            fallback: String::new(),
        }
    }
}

/// A named collection of entries sharing one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema: Vec<ValueSchema>,
    pub created: Timestamp,
}

impl Dataset {
    pub fn new(name: impl Into<String>, schema: Vec<ValueSchema>) -> Self {
        Self {
            id: DatasetId::new(),
            name: name.into(),
            description: String::new(),
            schema,
            created: Timestamp::now(),
        }
    }
}

/// One committed row of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub dataset_id: DatasetId,
    pub values: IoValues,
}

/// Reference to a dataset, the runtime value of a `DATASET` socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub dataset_id: DatasetId,
}

impl DatasetRef {
    pub fn new(dataset_id: DatasetId) -> Self {
        Self { dataset_id }
    }

    /// Reads a reference out of a socket value.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Converts the reference into a socket value.
    pub fn to_value(self) -> serde_json::Value {
        serde_json::json!({ "datasetId": self.dataset_id })
    }
}
