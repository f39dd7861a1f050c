#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod error;
pub mod supervisor;

pub use config::{DEFAULT_MAX_CONCURRENT_PROCESSES, SupervisorConfig};
pub use error::{Result, WorkerError};
pub use supervisor::{CalculationSupervisor, ProcessHandle};

/// Tracing target for worker operations.
pub const TRACING_TARGET: &str = "calcflow_worker";
