//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use calcflow_core::types::{CalculationProcess, NodeState, OutputResult, ProcessState};
use calcflow_memory::MemoryStore;
use calcflow_runtime::engine::{Engine, EngineConfig};
use calcflow_runtime::registry::NodeRegistry;
use calcflow_worker::{CalculationSupervisor, SupervisorConfig};
use serde::Serialize;

use crate::TRACING_TARGET_COMMAND;
use crate::config::EngineOptions;
use crate::document::{LoadedWorkspace, WorkspaceDocument, load_document};

/// A loaded document with the engine working on it.
struct Session {
    store: Arc<MemoryStore>,
    engine: Arc<Engine>,
    workspace: LoadedWorkspace,
}

impl Session {
    async fn open(file: &Path, config: EngineConfig) -> anyhow::Result<Self> {
        let json = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        let document = WorkspaceDocument::from_json(&json)
            .with_context(|| format!("failed to parse {}", file.display()))?;

        let mut registry = NodeRegistry::new();
        calcflow_nodes::register_builtin_nodes(&mut registry)
            .context("failed to register built-in node types")?;

        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(Engine::new(
            Arc::new(registry),
            store.clone(),
            store.clone(),
            config,
        ));
        let workspace = load_document(&engine, &store, &document)
            .await
            .with_context(|| format!("failed to load {}", file.display()))?;

        Ok(Self {
            store,
            engine,
            workspace,
        })
    }
}

#[derive(Debug, Serialize)]
struct NodeReport<'a> {
    key: &'a str,
    state: NodeState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationReport<'a> {
    valid: bool,
    nodes: Vec<NodeReport<'a>>,
}

#[derive(Debug, Serialize)]
struct ResultReport<'a> {
    key: Option<&'a str>,
    #[serde(flatten)]
    result: OutputResult,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    process: CalculationProcess,
    results: Vec<ResultReport<'a>>,
}

fn print_json(report: &impl Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}

/// Prints the validation state of every node declared in the document.
pub async fn validate(file: &Path, options: &EngineOptions) -> anyhow::Result<()> {
    let session = Session::open(file, options.to_config()?).await?;
    let states = session
        .engine
        .revalidate_workspace(session.workspace.workspace_id)
        .await
        .context("failed to validate workspace")?;

    let nodes: Vec<_> = session
        .workspace
        .nodes()
        .map(|(key, node_id)| NodeReport {
            key,
            state: states.get(&node_id).copied().unwrap_or_default(),
        })
        .collect();
    let valid = nodes.iter().all(|node| node.state == NodeState::Valid);

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        nodes = nodes.len(),
        valid,
        "Workspace validated"
    );

    print_json(&ValidationReport { valid, nodes })
}

/// Runs a calculation process and prints it together with the stored results.
///
/// Fails after printing the report if the process ended in `ERROR`.
pub async fn run(
    file: &Path,
    options: &EngineOptions,
    supervisor: &SupervisorConfig,
) -> anyhow::Result<()> {
    let session = Session::open(file, options.to_config()?).await?;
    let workspace_id = session.workspace.workspace_id;

    let supervisor = CalculationSupervisor::new(
        session.engine.clone(),
        session.store.clone(),
        session.store.clone(),
        supervisor,
    );
    let process = supervisor
        .run_calculation(workspace_id)
        .await
        .context("failed to run calculation process")?;

    let results = supervisor
        .get_results(workspace_id)
        .await
        .context("failed to read results")?
        .into_iter()
        .map(|stored| ResultReport {
            key: session.workspace.key_of(stored.node_id),
            result: stored.result,
        })
        .collect();

    let state = process.state;
    let id = process.id;
    print_json(&RunReport { process, results })?;

    if state == ProcessState::Error {
        anyhow::bail!("calculation process {id} finished with {state}");
    }
    Ok(())
}
