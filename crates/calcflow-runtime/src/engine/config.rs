//! Engine configuration.

use derive_builder::Builder;

/// Configuration for the calculation engine.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Resolve the inputs of a node concurrently.
    #[builder(default = "true")]
    pub concurrent_inputs: bool,

    /// Persist progress reported by long-running nodes.
    #[builder(default = "true")]
    pub report_progress: bool,

    /// Upper bound of context iterations per node execution.
    #[builder(default)]
    pub max_context_iterations: Option<usize>,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.max_context_iterations {
            return Err("max_context_iterations must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrent_inputs: true,
            report_progress: true,
            max_context_iterations: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfigBuilder::default().build().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_builder_validation() {
        let config = EngineConfigBuilder::default()
            .concurrent_inputs(false)
            .max_context_iterations(10_usize)
            .build()
            .unwrap();
        assert!(!config.concurrent_inputs);
        assert_eq!(config.max_context_iterations, Some(10));

        let err = EngineConfigBuilder::default()
            .max_context_iterations(0_usize)
            .build();
        assert!(err.is_err());
    }
}
