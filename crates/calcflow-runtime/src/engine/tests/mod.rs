//! Engine tests over an in-memory store and a handful of fixture node types.


use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use calcflow_core::port::GraphRepository;
use calcflow_core::types::{
    ContextBoundary, DataType, Form, FormExt, IoValues, MetaValue, NodeInstance, OutputResult,
    SocketDef, SocketDefs, SocketMetas, SocketRef, all_present,
};
use calcflow_core::{NodeId, WorkspaceId};
use calcflow_memory::MemoryStore;
use serde_json::{Value, json};

use super::{Engine, EngineConfig, MetaContext, NodeContext};
use crate::error::{EngineError, EngineResult};
use crate::node::{ContextDefinition, NodeDescriptor, NodeOutput, NodeType};
use crate::registry::NodeRegistry;

/// Present metas for every declared output when all inputs are present.
fn pass_presence(descriptor: &NodeDescriptor, inputs: &SocketMetas) -> SocketMetas {
    let meta = if all_present(inputs) {
        MetaValue::present(json!({}))
    } else {
        MetaValue::absent()
    };
    descriptor
        .outputs
        .keys()
        .map(|name| (name.clone(), meta.clone()))
        .collect()
}

fn single(name: &str, value: Value) -> IoValues {
    IoValues::from([(name.to_owned(), value)])
}

/// Emits its `value` form field.
struct Constant(NodeDescriptor);

impl Constant {
    fn new() -> Self {
        Self(NodeDescriptor::new("Constant").output("value", DataType::Custom, "Value"))
    }
}

#[async_trait]
impl NodeType for Constant {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        form.contains_key("value")
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_presence(&self.0, inputs))
    }

    async fn on_node_execution(
        &self,
        form: &Form,
        _inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let value = form.get("value").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new(single("value", value)))
    }
}

/// Passes its input through and counts executions.
struct Counted {
    descriptor: NodeDescriptor,
    executions: Arc<AtomicUsize>,
}

#[async_trait]
impl NodeType for Counted {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_presence(&self.descriptor, inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(NodeOutput::new(inputs.clone()))
    }
}

/// Computes `a - b`.
struct Difference(NodeDescriptor);

impl Difference {
    fn new() -> Self {
        Self(
            NodeDescriptor::new("Difference")
                .input("a", DataType::Number, "A")
                .input("b", DataType::Number, "B")
                .output("value", DataType::Number, "Value"),
        )
    }
}

#[async_trait]
impl NodeType for Difference {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_presence(&self.0, inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let a = inputs.number_value("a").unwrap_or_default();
        let b = inputs.number_value("b").unwrap_or_default();
        Ok(NodeOutput::new(single("value", json!(a - b))))
    }
}

/// Delays its `value` input by `ms - value` milliseconds and records the
/// highest number of overlapping executions.
struct Slow {
    descriptor: NodeDescriptor,
    active: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

impl Slow {
    fn new(peak: Arc<AtomicUsize>) -> Self {
        Self {
            descriptor: NodeDescriptor::new("Slow")
                .input("value", DataType::Number, "Value")
                .output("value", DataType::Number, "Value"),
            active: AtomicUsize::new(0),
            peak,
        }
    }
}

#[async_trait]
impl NodeType for Slow {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_presence(&self.descriptor, inputs))
    }

    async fn on_node_execution(
        &self,
        form: &Form,
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let ms = form.number_value("ms").unwrap_or_default()
            - inputs.number_value("value").unwrap_or_default();
        tokio::time::sleep(Duration::from_millis(ms.max(0.0) as u64)).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(NodeOutput::new(inputs.clone()))
    }
}

/// Uppercases a string.
struct Shout(NodeDescriptor);

impl Shout {
    fn new() -> Self {
        Self(
            NodeDescriptor::new("Shout")
                .input("value", DataType::String, "Value")
                .output("value", DataType::String, "Value"),
        )
    }
}

#[async_trait]
impl NodeType for Shout {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_presence(&self.0, inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let value = inputs.str_value("value").unwrap_or_default();
        Ok(NodeOutput::new(single("value", json!(value.to_uppercase()))))
    }
}

/// Terminal node turning its input into a result.
struct Sink(NodeDescriptor);

impl Sink {
    fn new() -> Self {
        Self(
            NodeDescriptor::new("Sink")
                .input("value", DataType::Custom, "Value")
                .terminal(),
        )
    }
}

#[async_trait]
impl NodeType for Sink {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        _inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(SocketMetas::new())
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let result = OutputResult {
            name: "sink".into(),
            value: inputs.get("value").cloned().unwrap_or(Value::Null),
            data_type: DataType::Custom,
            workspace_id: ctx.workspace_id(),
            description: String::new(),
        };
        Ok(NodeOutput::with_results(IoValues::new(), result))
    }
}

/// Runs its scope once per element of `items`.
struct ForEach(NodeDescriptor);

impl ForEach {
    fn new() -> Self {
        Self(
            NodeDescriptor::new("ForEach")
                .input("items", DataType::Custom, "Items")
                .output("results", DataType::Custom, "Results"),
        )
    }
}

impl ContextDefinition for ForEach {
    fn context_input_defs(&self, _input_defs: &SocketDefs, _inputs: &SocketMetas) -> SocketDefs {
        SocketDefs::from([("item".to_owned(), SocketDef::new(DataType::Number, "Item"))])
    }

    fn context_output_defs(
        &self,
        _inputs: &SocketMetas,
        _context_inputs: &SocketDefs,
    ) -> SocketDefs {
        SocketDefs::from([("result".to_owned(), SocketDef::new(DataType::Custom, "Result"))])
    }
}

#[async_trait]
impl NodeType for ForEach {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_input_valid(&self, inputs: &IoValues) -> bool {
        inputs.get("items").is_some_and(Value::is_array)
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_presence(&self.0, inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let items = inputs
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let total = items.len();
        let mut results = Vec::with_capacity(total);
        for (i, item) in items.into_iter().enumerate() {
            let mut outputs = ctx.invoke_context(single("item", item)).await?;
            results.push(outputs.remove("result").unwrap_or(Value::Null));
            ctx.set_progress(Some((i + 1) as f64 / total as f64)).await?;
        }
        ctx.set_progress(None).await?;

        Ok(NodeOutput::new(single("results", json!(results))))
    }

    fn context(&self) -> Option<&dyn ContextDefinition> {
        Some(self)
    }
}

/// Tries to run a scope it does not have.
struct NoScope(NodeDescriptor);

#[async_trait]
impl NodeType for NoScope {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        _inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(SocketMetas::new())
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        _inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        assert!(!ctx.has_context());
        let outputs = ctx.invoke_context(IoValues::new()).await?;
        Ok(NodeOutput::new(outputs))
    }
}

/// Engine over a fresh store with every fixture type registered.
struct Harness {
    store: MemoryStore,
    engine: Engine,
    workspace_id: WorkspaceId,
    executions: Arc<AtomicUsize>,
    slow_peak: Arc<AtomicUsize>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    async fn with_config(config: EngineConfig) -> Self {
        let executions = Arc::new(AtomicUsize::new(0));
        let slow_peak = Arc::new(AtomicUsize::new(0));
        let mut registry = NodeRegistry::new();
        registry.register(Constant::new()).unwrap();
        registry
            .register(Counted {
                descriptor: NodeDescriptor::new("Counted")
                    .input("value", DataType::Custom, "Value")
                    .output("value", DataType::Custom, "Value"),
                executions: Arc::clone(&executions),
            })
            .unwrap();
        registry.register(Difference::new()).unwrap();
        registry.register(Slow::new(Arc::clone(&slow_peak))).unwrap();
        registry.register(Shout::new()).unwrap();
        registry.register(Sink::new()).unwrap();
        registry.register(ForEach::new()).unwrap();
        registry
            .register(NoScope(NodeDescriptor::new("NoScope")))
            .unwrap();

        let store = MemoryStore::new();
        let workspace = store.create_workspace("test", "").await;
        let engine = Engine::new(
            Arc::new(registry),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            config,
        );

        Self {
            store,
            engine,
            workspace_id: workspace.id,
            executions,
            slow_peak,
        }
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Highest number of `Slow` nodes that were running at the same time.
    fn slow_peak(&self) -> usize {
        self.slow_peak.load(Ordering::SeqCst)
    }

    async fn node(&self, node_type: &str) -> NodeInstance {
        self.node_in(node_type, vec![]).await
    }

    async fn node_in(&self, node_type: &str, context_ids: Vec<NodeId>) -> NodeInstance {
        self.engine
            .editor()
            .create_node(node_type, self.workspace_id, context_ids, 0.0, 0.0)
            .await
            .unwrap()
    }

    async fn constant(&self, raw: &str) -> NodeInstance {
        let node = self.node("Constant").await;
        self.engine
            .editor()
            .add_or_update_form_value(node.id, "value", raw)
            .await
            .unwrap();
        node
    }

    async fn connect(&self, from: &NodeInstance, output: &str, to: &NodeInstance, input: &str) {
        self.try_connect(from, output, to, input).await.unwrap();
    }

    async fn try_connect(
        &self,
        from: &NodeInstance,
        output: &str,
        to: &NodeInstance,
        input: &str,
    ) -> EngineResult<()> {
        self.engine
            .editor()
            .create_connection(SocketRef::new(from.id, output), SocketRef::new(to.id, input))
            .await
            .map(|_| ())
    }

    async fn boundary(&self, owner: &NodeInstance, boundary: ContextBoundary) -> NodeInstance {
        self.store.get_context_node(owner, boundary).await.unwrap()
    }

    /// `Constant(items) -> ForEach` whose scope computes `item - 1`.
    async fn for_each(&self, items: &str) -> NodeInstance {
        let items = self.constant(items).await;
        let for_each = self.node("ForEach").await;
        self.connect(&items, "value", &for_each, "items").await;

        let input = self.boundary(&for_each, ContextBoundary::Input).await;
        let output = self.boundary(&for_each, ContextBoundary::Output).await;
        let one = self.node_in("Constant", vec![for_each.id]).await;
        self.engine
            .editor()
            .add_or_update_form_value(one.id, "value", "1")
            .await
            .unwrap();
        let difference = self.node_in("Difference", vec![for_each.id]).await;
        self.connect(&input, "item", &difference, "a").await;
        self.connect(&one, "value", &difference, "b").await;
        self.connect(&difference, "value", &output, "result").await;

        for_each
    }
}

fn assert_failed_with(
    result: EngineResult<NodeOutput>,
    check: impl FnOnce(&EngineError) -> bool,
) {
    match result {
        Err(err) => assert!(check(&err), "unexpected error: {err}"),
        Ok(output) => panic!("expected failure, got {output:?}"),
    }
}
