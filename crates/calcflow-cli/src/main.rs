#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod document;
mod telemetry;

use std::process;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "calcflow_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "calcflow_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "calcflow_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "calcflow_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    telemetry::init_tracing(cli.log_format)?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting calcflow"
    );
    cli.log();

    match &cli.command {
        Command::Validate { file, engine } => commands::validate(file, engine).await,
        Command::Run {
            file,
            engine,
            supervisor,
        } => commands::run(file, engine, supervisor).await,
    }
}
