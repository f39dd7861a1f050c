//! Document loading errors.

use calcflow_core::StoreError;
use calcflow_runtime::EngineError;

/// Result type for document operations.
pub type DocumentResult<T, E = DocumentError> = std::result::Result<T, E>;

/// Errors raised while parsing or loading a workspace document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document is not valid JSON or does not match the format.
    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two nodes or datasets share a key.
    #[error("duplicate {kind} key '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    /// A key does not name a node or dataset declared earlier.
    #[error("unknown {kind} key '{key}'")]
    UnknownKey { kind: &'static str, key: String },

    /// The engine rejected an edit.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DocumentError {
    pub(crate) fn unknown(kind: &'static str, key: impl Into<String>) -> Self {
        Self::UnknownKey {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            kind,
            key: key.into(),
        }
    }
}
