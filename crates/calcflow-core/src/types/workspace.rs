//! Workspace aggregate record.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::id::WorkspaceId;

/// A workspace owning one node graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created: Timestamp,
    pub last_change: Timestamp,
}

impl Workspace {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: WorkspaceId::new(),
            name: name.into(),
            description: description.into(),
            created: now,
            last_change: now,
        }
    }
}
