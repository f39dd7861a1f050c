//! Contexts handed to node types.

use calcflow_core::port::DatasetRepository;
use calcflow_core::types::{IoValues, NodeInstance};
use calcflow_core::{NodeId, WorkspaceId};
use tokio_util::sync::CancellationToken;

use super::Engine;
use super::execute::Run;
use crate::error::{EngineError, EngineResult};
use crate::snapshot::GraphSnapshot;

/// Tracing target for context scopes.
const TRACING_TARGET: &str = "calcflow_runtime::context";

/// Read-only context of a meta-execution callback.
pub struct MetaContext<'a> {
    engine: &'a Engine,
    node: &'a NodeInstance,
}

impl<'a> MetaContext<'a> {
    pub(crate) fn new(engine: &'a Engine, node: &'a NodeInstance) -> Self {
        Self { engine, node }
    }

    /// Returns the node being evaluated.
    #[inline]
    pub fn node(&self) -> &NodeInstance {
        self.node
    }

    /// Returns the dataset repository.
    #[inline]
    pub fn datasets(&self) -> &dyn DatasetRepository {
        self.engine.datasets()
    }
}

/// Context of a node execution callback.
pub struct NodeContext<'a> {
    engine: &'a Engine,
    node: &'a NodeInstance,
    scope: Option<ContextScope<'a>>,
    cancel: &'a CancellationToken,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        node: &'a NodeInstance,
        scope: Option<ContextScope<'a>>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            engine,
            node,
            scope,
            cancel,
        }
    }

    /// Returns the node being executed.
    #[inline]
    pub fn node(&self) -> &NodeInstance {
        self.node
    }

    /// Returns the workspace of the node being executed.
    #[inline]
    pub fn workspace_id(&self) -> WorkspaceId {
        self.node.workspace_id
    }

    /// Returns the dataset repository.
    #[inline]
    pub fn datasets(&self) -> &dyn DatasetRepository {
        self.engine.datasets()
    }

    /// Returns whether the node owns a nested scope.
    #[inline]
    pub fn has_context(&self) -> bool {
        self.scope.is_some()
    }

    /// Returns whether the surrounding run was cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stores the progress of the executing node.
    pub async fn set_progress(&self, value: Option<f64>) -> EngineResult<()> {
        self.engine.set_progress(self.node.id, value).await
    }

    /// Runs the nested scope once with `item_inputs`.
    ///
    /// Fails with [`EngineError::MissingContextFunction`] if the node has no
    /// scope.
    pub async fn invoke_context(&mut self, item_inputs: IoValues) -> EngineResult<IoValues> {
        let node_id = self.node.id;
        let scope = self
            .scope
            .as_mut()
            .ok_or(EngineError::MissingContextFunction { node_id })?;
        scope.invoke(item_inputs).await
    }

    /// Returns the nested scope, if any.
    pub fn scope(&mut self) -> Option<&mut ContextScope<'a>> {
        self.scope.as_mut()
    }
}

/// The nested scope of a context-providing node.
///
/// Each [`invoke`] runs the scope once with a fresh cache. Taking `&mut self`
/// keeps iterations strictly sequential, in the order the caller issues
/// them.
///
/// [`invoke`]: ContextScope::invoke
pub struct ContextScope<'a> {
    engine: &'a Engine,
    snapshot: &'a GraphSnapshot,
    cancel: &'a CancellationToken,
    owner_id: NodeId,
    input_id: NodeId,
    output_id: NodeId,
    iterations: usize,
}

impl<'a> ContextScope<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        snapshot: &'a GraphSnapshot,
        cancel: &'a CancellationToken,
        owner_id: NodeId,
        input_id: NodeId,
        output_id: NodeId,
    ) -> Self {
        Self {
            engine,
            snapshot,
            cancel,
            owner_id,
            input_id,
            output_id,
            iterations: 0,
        }
    }

    /// Returns how many iterations ran so far.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Seeds the `ContextInput` with `item_inputs`, executes the scope up to
    /// its `ContextOutput` and returns the values arriving there.
    pub async fn invoke(&mut self, item_inputs: IoValues) -> EngineResult<IoValues> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(limit) = self.engine.config().max_context_iterations
            && self.iterations >= limit
        {
            return Err(EngineError::ContextIterationLimit {
                node_id: self.owner_id,
                limit,
            });
        }
        self.iterations += 1;

        tracing::trace!(
            target: TRACING_TARGET,
            owner_id = %self.owner_id,
            iteration = self.iterations,
            "Invoking context"
        );

        let run = Run::seeded(
            self.engine,
            self.snapshot,
            self.cancel,
            self.input_id,
            item_inputs,
        );
        let output = run.execute(self.output_id).await?;
        Ok(output.outputs.clone())
    }
}
