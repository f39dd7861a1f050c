//! String nodes.

use async_trait::async_trait;
use calcflow_core::types::{DataType, Form, FormExt, IoValues, SocketMetas};
use calcflow_runtime::EngineResult;
use calcflow_runtime::engine::{MetaContext, NodeContext};
use calcflow_runtime::node::{NodeDescriptor, NodeOutput, NodeType};
use serde_json::{Value, json};

use crate::util::{is_output_form_valid, output_result, presence};

/// Emits the string entered in its `value` form field.
#[derive(Debug)]
pub struct StringInput(NodeDescriptor);

impl Default for StringInput {
    fn default() -> Self {
        Self(NodeDescriptor::new("StringInput").output("value", DataType::String, "String"))
    }
}

#[async_trait]
impl NodeType for StringInput {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        form.str_value("value").is_some()
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(presence(self.0.outputs.keys(), inputs))
    }

    async fn on_node_execution(
        &self,
        form: &Form,
        _inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let value = form.str_value("value").unwrap_or_default();
        Ok(NodeOutput::new(IoValues::from([(
            "value".to_owned(),
            json!(value),
        )])))
    }
}

/// Publishes a string as a named result.
#[derive(Debug)]
pub struct StringOutput(NodeDescriptor);

impl Default for StringOutput {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("StringOutput")
                .input("value", DataType::String, "String")
                .terminal(),
        )
    }
}

#[async_trait]
impl NodeType for StringOutput {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        is_output_form_valid(form)
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
        form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let value = inputs.get("value").cloned().unwrap_or(Value::Null);
        let results = output_result(form, value, DataType::String, ctx);
        Ok(NodeOutput::with_results(IoValues::new(), results))
    }
}
