#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod engine;
mod error;
pub mod node;
pub mod registry;
pub mod snapshot;
pub mod validation;

#[doc(hidden)]
pub mod prelude;

pub use error::{EngineError, EngineResult, RegistryError};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "calcflow_runtime";
