//! Repository ports.
//!
//! The engine and the supervisor only talk to storage through these traits:
//!
//! - [`GraphRepository`]: nodes and connections of a workspace
//! - [`DatasetRepository`]: committed dataset entries
//! - [`ProcessRepository`]: calculation processes and their results

mod dataset;
mod graph;
mod process;

pub use dataset::DatasetRepository;
pub use graph::GraphRepository;
pub use process::ProcessRepository;
