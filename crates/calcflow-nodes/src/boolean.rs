//! Boolean nodes.

use async_trait::async_trait;
use calcflow_core::types::{DataType, Form, IoValues, SocketMetas};
use calcflow_runtime::EngineResult;
use calcflow_runtime::engine::{MetaContext, NodeContext};
use calcflow_runtime::node::{NodeDescriptor, NodeOutput, NodeType};
use serde_json::json;

use crate::util::presence;

/// Compares two strings.
#[derive(Debug)]
pub struct EqualsString(NodeDescriptor);

impl Default for EqualsString {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("EqualsString")
                .input("valueA", DataType::String, "Value A")
                .input("valueB", DataType::String, "Value B")
                .output("equals", DataType::Boolean, "Equals"),
        )
    }
}

#[async_trait]
impl NodeType for EqualsString {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
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
        _form: &Form,
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let equals = inputs.get("valueA") == inputs.get("valueB");
        Ok(NodeOutput::new(IoValues::from([(
            "equals".to_owned(),
            json!(equals),
        )])))
    }
}
