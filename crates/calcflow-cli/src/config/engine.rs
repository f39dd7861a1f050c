//! Engine options.

use anyhow::Context;
use calcflow_runtime::engine::{EngineConfig, EngineConfigBuilder};
use clap::Args;

/// Options forwarded to the calculation engine.
#[derive(Debug, Clone, Default, Args)]
pub struct EngineOptions {
    /// Resolve the inputs of a node one after another.
    #[arg(long, env = "CALCFLOW_SEQUENTIAL_INPUTS")]
    pub sequential_inputs: bool,

    /// Do not persist the progress of long-running nodes.
    #[arg(long, env = "CALCFLOW_NO_PROGRESS")]
    pub no_progress: bool,

    /// Fail context nodes that iterate more often than this.
    #[arg(long, env = "CALCFLOW_MAX_CONTEXT_ITERATIONS")]
    pub max_context_iterations: Option<usize>,
}

impl EngineOptions {
    /// Builds the engine configuration.
    pub fn to_config(&self) -> anyhow::Result<EngineConfig> {
        EngineConfigBuilder::default()
            .concurrent_inputs(!self.sequential_inputs)
            .report_progress(!self.no_progress)
            .max_context_iterations(self.max_context_iterations)
            .build()
            .context("invalid engine configuration")
    }
}
