//! Supervisor configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default number of calculation processes running at the same time.
pub const DEFAULT_MAX_CONCURRENT_PROCESSES: usize = 4;

/// Configuration of a [`CalculationSupervisor`].
///
/// [`CalculationSupervisor`]: crate::CalculationSupervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct SupervisorConfig {
    /// Maximum number of calculation processes running simultaneously.
    ///
    /// Processes started beyond this bound stay `STARTED` until a slot frees up.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-concurrent-processes",
            env = "CALCFLOW_MAX_CONCURRENT_PROCESSES",
            default_value_t = DEFAULT_MAX_CONCURRENT_PROCESSES
        )
    )]
    #[serde(default = "default_max_concurrent_processes")]
    pub max_concurrent_processes: usize,
}

fn default_max_concurrent_processes() -> usize {
    DEFAULT_MAX_CONCURRENT_PROCESSES
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_processes: DEFAULT_MAX_CONCURRENT_PROCESSES,
        }
    }
}

impl SupervisorConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit.
    pub fn with_max_concurrent_processes(mut self, max_concurrent_processes: usize) -> Self {
        self.max_concurrent_processes = max_concurrent_processes;
        self
    }

    /// Number of semaphore permits backing the limit.
    ///
    /// A limit of zero would never admit a process and is raised to one.
    pub(crate) fn permits(&self) -> usize {
        self.max_concurrent_processes
            .clamp(1, tokio::sync::Semaphore::MAX_PERMITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SupervisorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SupervisorConfig::default());
        assert_eq!(config.max_concurrent_processes, 4);
    }

    #[test]
    fn test_permits_are_never_zero() {
        let config = SupervisorConfig::new().with_max_concurrent_processes(0);
        assert_eq!(config.permits(), 1);
        assert_eq!(SupervisorConfig::new().permits(), 4);
    }
}
