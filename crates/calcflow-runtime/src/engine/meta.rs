//! Meta-execution: symbolic propagation of socket presence.

use std::collections::HashMap;

use calcflow_core::NodeId;
use calcflow_core::types::{
    ContextBoundary, MetaValue, NodeInstance, SocketDefs, SocketMetas, all_present, parse_form,
    required_present,
};
use futures::future::BoxFuture;

use super::context::MetaContext;
use super::{Engine, declared_inputs};
use crate::error::EngineResult;
use crate::snapshot::GraphSnapshot;

/// Tracing target for meta-execution.
const TRACING_TARGET: &str = "calcflow_runtime::meta";

/// One meta-execution pass over a snapshot.
///
/// Output metas are memoized per node for the lifetime of the pass, so a
/// node with several consumers is evaluated once. Nothing is written.
pub(crate) struct MetaPass<'a> {
    engine: &'a Engine,
    snapshot: &'a GraphSnapshot,
    outputs: HashMap<NodeId, SocketMetas>,
}

impl<'a> MetaPass<'a> {
    pub fn new(engine: &'a Engine, snapshot: &'a GraphSnapshot) -> Self {
        Self {
            engine,
            snapshot,
            outputs: HashMap::new(),
        }
    }

    /// Computes the output metas of a node.
    pub fn node_outputs(&mut self, node_id: NodeId) -> BoxFuture<'_, EngineResult<SocketMetas>> {
        Box::pin(async move {
            if let Some(cached) = self.outputs.get(&node_id) {
                return Ok(cached.clone());
            }

            let (engine, snapshot) = (self.engine, self.snapshot);
            let node = snapshot.try_node(node_id)?;
            let outputs = match node.boundary() {
                Some(ContextBoundary::Input) => {
                    let owner = snapshot.owner_of(node)?;
                    let owner_inputs = self.owner_inputs(owner).await?;
                    let is_present = all_present(&owner_inputs);
                    self.context_input_defs(owner)
                        .await?
                        .into_keys()
                        .map(|name| {
                            let meta = MetaValue {
                                is_present,
                                ..MetaValue::absent()
                            };
                            (name, meta)
                        })
                        .collect()
                }
                Some(ContextBoundary::Output) => SocketMetas::new(),
                None => {
                    let node_type = engine.registry().resolve(&node.node_type)?;
                    let inputs = self.meta_inputs(node).await?;
                    let form = parse_form(&node.form);
                    let ctx = MetaContext::new(engine, node);
                    node_type.on_meta_execution(&form, &inputs, &ctx).await?
                }
            };

            tracing::trace!(
                target: TRACING_TARGET,
                node_id = %node_id,
                outputs = outputs.len(),
                "Meta outputs computed"
            );

            self.outputs.insert(node_id, outputs.clone());
            Ok(outputs)
        })
    }

    /// Resolves the metas feeding each of `defs` on `node`.
    ///
    /// Unconnected sockets resolve to absent values.
    async fn resolve(
        &mut self,
        node: &NodeInstance,
        defs: &SocketDefs,
    ) -> EngineResult<SocketMetas> {
        let snapshot = self.snapshot;
        let mut metas = SocketMetas::new();
        for name in defs.keys() {
            let meta = match snapshot.source_of(node.id, name) {
                Some(from) => self
                    .node_outputs(from.node_id)
                    .await?
                    .remove(&from.name)
                    .unwrap_or_else(MetaValue::absent),
                None => MetaValue::absent(),
            };
            metas.insert(name.clone(), meta);
        }
        Ok(metas)
    }

    async fn owner_inputs(&mut self, owner: &NodeInstance) -> EngineResult<SocketMetas> {
        let engine = self.engine;
        let node_type = engine.registry().resolve(&owner.node_type)?;
        let defs = declared_inputs(node_type.as_ref(), owner);
        self.resolve(owner, &defs).await
    }

    /// Returns the sockets the owner offers inside its scope.
    pub async fn context_input_defs(&mut self, owner: &NodeInstance) -> EngineResult<SocketDefs> {
        let engine = self.engine;
        let node_type = engine.registry().resolve(&owner.node_type)?;
        let Some(context) = node_type.context() else {
            return Ok(SocketDefs::new());
        };
        let defs = declared_inputs(node_type.as_ref(), owner);
        let inputs = self.resolve(owner, &defs).await?;
        Ok(context.context_input_defs(&defs, &inputs))
    }

    /// Returns the sockets the owner expects at the exit of its scope.
    pub async fn context_output_defs(&mut self, owner: &NodeInstance) -> EngineResult<SocketDefs> {
        let engine = self.engine;
        let node_type = engine.registry().resolve(&owner.node_type)?;
        let Some(context) = node_type.context() else {
            return Ok(SocketDefs::new());
        };
        let defs = declared_inputs(node_type.as_ref(), owner);
        let inputs = self.resolve(owner, &defs).await?;
        let context_inputs = context.context_input_defs(&defs, &inputs);
        Ok(context.context_output_defs(&inputs, &context_inputs))
    }

    /// Returns the input socket definitions of any node.
    pub async fn input_defs(&mut self, node: &NodeInstance) -> EngineResult<SocketDefs> {
        let (engine, snapshot) = (self.engine, self.snapshot);
        match node.boundary() {
            Some(ContextBoundary::Input) => Ok(SocketDefs::new()),
            Some(ContextBoundary::Output) => {
                let owner = snapshot.owner_of(node)?;
                self.context_output_defs(owner).await
            }
            None => {
                let node_type = engine.registry().resolve(&node.node_type)?;
                Ok(declared_inputs(node_type.as_ref(), node))
            }
        }
    }

    /// Returns the output socket definitions of any node.
    pub async fn output_defs(&mut self, node: &NodeInstance) -> EngineResult<SocketDefs> {
        let (engine, snapshot) = (self.engine, self.snapshot);
        match node.boundary() {
            Some(ContextBoundary::Input) => {
                let owner = snapshot.owner_of(node)?;
                self.context_input_defs(owner).await
            }
            Some(ContextBoundary::Output) => Ok(SocketDefs::new()),
            None => {
                let node_type = engine.registry().resolve(&node.node_type)?;
                Ok(node_type.descriptor().outputs.clone())
            }
        }
    }

    /// Resolves the input metas of any node.
    pub async fn meta_inputs(&mut self, node: &NodeInstance) -> EngineResult<SocketMetas> {
        let defs = self.input_defs(node).await?;
        self.resolve(node, &defs).await
    }

    /// Returns whether a node is runnable.
    ///
    /// Boundary nodes are always valid; their owner answers for them. A
    /// context owner is additionally invalid while its scope leaves a
    /// required input of the `ContextOutput` unconnected. Optional sockets
    /// never count against validity.
    pub async fn is_valid(&mut self, node: &NodeInstance) -> EngineResult<bool> {
        if node.is_context_boundary() {
            return Ok(true);
        }

        let (engine, snapshot) = (self.engine, self.snapshot);
        let node_type = engine.registry().resolve(&node.node_type)?;
        let form = parse_form(&node.form);
        if !node_type.is_form_valid(&form) {
            return Ok(false);
        }
        if !self.is_fed(node).await? {
            return Ok(false);
        }
        if node_type.context().is_some() {
            let output = snapshot.context_node(node, ContextBoundary::Output)?;
            return self.is_fed(output).await;
        }
        Ok(true)
    }

    /// Returns whether every required input of a node is present.
    async fn is_fed(&mut self, node: &NodeInstance) -> EngineResult<bool> {
        let defs = self.input_defs(node).await?;
        let metas = self.resolve(node, &defs).await?;
        Ok(required_present(&metas, &defs))
    }
}
