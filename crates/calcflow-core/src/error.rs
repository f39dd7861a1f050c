//! Repository error types.

use std::borrow::Cow;
use std::fmt::Display;

use thiserror::Error;

/// Boxed error that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by implementations of the repository ports.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record, e.g. `"node"`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The write conflicts with the stored state.
    #[error("conflict: {0}")]
    Conflict(Cow<'static, str>),

    /// The backing store failed.
    #[error("storage failure: {message}")]
    Internal {
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxedError>,
    },
}

impl StoreError {
    /// Creates a not-found error for the given record.
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an internal error with a source.
    pub fn internal_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns whether this is a not-found error.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
