//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── log_format: LogFormat        # text or json log lines
//! └── command: Command
//!     ├── validate <FILE>          # engine options
//!     └── run <FILE>               # engine and supervisor options
//! ```
//!
//! Every option can also be provided through environment variables.

mod engine;

use std::path::PathBuf;
use std::process;

use calcflow_worker::SupervisorConfig;
use clap::{Parser, Subcommand};
pub use engine::EngineOptions;

use crate::TRACING_TARGET_CONFIG;
use crate::telemetry::LogFormat;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "calcflow")]
#[command(about = "Validate and calculate calcflow workspace documents")]
#[command(version)]
pub struct Cli {
    /// Format of the log lines written to stderr.
    #[arg(
        long,
        env = "CALCFLOW_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations on a workspace document.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Loads a workspace document and prints the validation state of every node.
    Validate {
        /// Path to the workspace document.
        file: PathBuf,

        #[command(flatten)]
        engine: EngineOptions,
    },

    /// Loads a workspace document and runs a calculation process over it.
    Run {
        /// Path to the workspace document.
        file: PathBuf,

        #[command(flatten)]
        engine: EngineOptions,

        #[command(flatten)]
        supervisor: SupervisorConfig,
    },
}

impl Command {
    /// Path of the workspace document.
    pub fn file(&self) -> &PathBuf {
        match self {
            Self::Validate { file, .. } | Self::Run { file, .. } => file,
        }
    }

    /// Engine options of the command.
    pub fn engine(&self) -> &EngineOptions {
        match self {
            Self::Validate { engine, .. } | Self::Run { engine, .. } => engine,
        }
    }
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information and the effective configuration.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        let engine = self.command.engine();
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            file = %self.command.file().display(),
            sequential_inputs = engine.sequential_inputs,
            no_progress = engine.no_progress,
            max_context_iterations = ?engine.max_context_iterations,
            "Engine configuration"
        );

        if let Command::Run { supervisor, .. } = &self.command {
            tracing::info!(
                target: TRACING_TARGET_CONFIG,
                max_concurrent_processes = supervisor.max_concurrent_processes,
                "Supervisor configuration"
            );
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
