//! Real execution of a node and its upstream graph.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use calcflow_core::NodeId;
use calcflow_core::types::{ContextBoundary, IoValues, NodeInstance, SocketRef, parse_form};
use futures::future::{BoxFuture, try_join_all};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use super::context::{ContextScope, NodeContext};
use super::{Engine, declared_inputs};
use crate::error::{EngineError, EngineResult};
use crate::node::NodeOutput;
use crate::snapshot::GraphSnapshot;
use crate::validation::are_inputs_valid;

/// Tracing target for node execution.
const TRACING_TARGET: &str = "calcflow_runtime::execute";

type Slot = Arc<OnceCell<Arc<NodeOutput>>>;

/// One top-level execution or one context iteration.
///
/// Every node reachable from the target runs at most once per run; its
/// output is shared by all consumers. A run never outlives its call and its
/// cache is never shared with another run.
pub(crate) struct Run<'a> {
    engine: &'a Engine,
    snapshot: &'a GraphSnapshot,
    cancel: &'a CancellationToken,
    /// Seed values of the scope's `ContextInput`, if this run is an iteration.
    seed: Option<(NodeId, IoValues)>,
    cache: Mutex<HashMap<NodeId, Slot>>,
}

impl<'a> Run<'a> {
    pub fn new(
        engine: &'a Engine,
        snapshot: &'a GraphSnapshot,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            engine,
            snapshot,
            cancel,
            seed: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an iteration run seeding the given `ContextInput`.
    pub fn seeded(
        engine: &'a Engine,
        snapshot: &'a GraphSnapshot,
        cancel: &'a CancellationToken,
        context_input: NodeId,
        values: IoValues,
    ) -> Self {
        Self {
            seed: Some((context_input, values)),
            ..Self::new(engine, snapshot, cancel)
        }
    }

    /// Returns how many nodes this run has started.
    pub fn executed_count(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Executes a node, reusing its output if it already ran in this run.
    pub fn execute(&self, node_id: NodeId) -> BoxFuture<'_, EngineResult<Arc<NodeOutput>>> {
        Box::pin(async move {
            let slot = self
                .cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(node_id)
                .or_default()
                .clone();

            let output = slot
                .get_or_try_init(|| async {
                    self.execute_uncached(node_id).await.map(Arc::new)
                })
                .await?;
            Ok(Arc::clone(output))
        })
    }

    async fn execute_uncached(&self, node_id: NodeId) -> EngineResult<NodeOutput> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let snapshot = self.snapshot;
        let node = snapshot.try_node(node_id)?;

        match node.boundary() {
            Some(ContextBoundary::Input) => match &self.seed {
                Some((seeded, values)) if *seeded == node.id => Ok(NodeOutput::new(values.clone())),
                _ => Err(EngineError::ContextNeedsContextInputs { node_id }),
            },
            Some(ContextBoundary::Output) => {
                let inputs = self.resolve_inputs(node).await?;
                Ok(NodeOutput::new(inputs))
            }
            None => self.execute_plain(node).await,
        }
    }

    async fn execute_plain(&self, node: &'a NodeInstance) -> EngineResult<NodeOutput> {
        let engine = self.engine;
        let node_type = engine.registry().resolve(&node.node_type)?;
        let form = parse_form(&node.form);
        if !node_type.is_form_valid(&form) {
            return Err(EngineError::FormOrInputsMissing { node_id: node.id });
        }

        let inputs = self.resolve_inputs(node).await?;
        let defs = declared_inputs(node_type.as_ref(), node);
        if !are_inputs_valid(&inputs, &defs) || !node_type.is_input_valid(&inputs) {
            return Err(EngineError::FormOrInputsMissing { node_id: node.id });
        }

        let snapshot = self.snapshot;
        let scope = match node_type.context() {
            Some(_) => {
                let input = snapshot.context_node(node, ContextBoundary::Input)?;
                let output = snapshot.context_node(node, ContextBoundary::Output)?;
                Some(ContextScope::new(
                    engine,
                    snapshot,
                    self.cancel,
                    node.id,
                    input.id,
                    output.id,
                ))
            }
            None => None,
        };

        tracing::trace!(
            target: TRACING_TARGET,
            node_id = %node.id,
            node_type = %node.node_type,
            inputs = inputs.len(),
            "Executing node"
        );

        let mut ctx = NodeContext::new(engine, node, scope, self.cancel);
        node_type.on_node_execution(&form, &inputs, &mut ctx).await
    }

    /// Executes every upstream node feeding `node` and collects the values
    /// arriving at its input sockets.
    ///
    /// Siblings may resolve concurrently; the resulting mapping is keyed by
    /// socket and independent of completion order.
    async fn resolve_inputs(&self, node: &'a NodeInstance) -> EngineResult<IoValues> {
        let snapshot = self.snapshot;
        let sources: Vec<(&'a str, &'a SocketRef)> = snapshot.inbound(node.id).collect();

        let fetch = move |(name, from): (&'a str, &'a SocketRef)| async move {
            let upstream = self.execute(from.node_id).await?;
            let value = upstream.outputs.get(&from.name).cloned();
            Ok::<_, EngineError>(value.map(|value| (name.to_owned(), value)))
        };

        let values = if self.engine.config().concurrent_inputs {
            try_join_all(sources.into_iter().map(fetch)).await?
        } else {
            let mut values = Vec::with_capacity(sources.len());
            for source in sources {
                values.push(fetch(source).await?);
            }
            values
        };

        Ok(values.into_iter().flatten().collect())
    }
}
