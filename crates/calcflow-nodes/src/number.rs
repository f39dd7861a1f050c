//! Number nodes.

use async_trait::async_trait;
use calcflow_core::types::{DataType, Form, FormExt, IoValues, SocketMetas};
use calcflow_runtime::EngineResult;
use calcflow_runtime::engine::{MetaContext, NodeContext};
use calcflow_runtime::node::{NodeDescriptor, NodeOutput, NodeType};
use serde_json::json;
use strum::{Display, EnumString};

use crate::util::{is_output_form_valid, output_result, presence};

/// Emits the number entered in its `value` form field.
#[derive(Debug)]
pub struct NumberInput(NodeDescriptor);

impl Default for NumberInput {
    fn default() -> Self {
        Self(NodeDescriptor::new("NumberInput").output("value", DataType::Number, "Number"))
    }
}

#[async_trait]
impl NodeType for NumberInput {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        form.number_value("value").is_some()
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
        let value = form.number_value("value").unwrap_or_default();
        Ok(NodeOutput::new(IoValues::from([(
            "value".to_owned(),
            json!(value),
        )])))
    }
}

/// Publishes a number as a named result.
#[derive(Debug)]
pub struct NumberOutput(NodeDescriptor);

impl Default for NumberOutput {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("NumberOutput")
                .input("value", DataType::Number, "Number")
                .terminal(),
        )
    }
}

#[async_trait]
impl NodeType for NumberOutput {
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
        let value = json!(inputs.number_value("value").unwrap_or_default());
        let results = output_result(form, value, DataType::Number, ctx);
        Ok(NodeOutput::with_results(IoValues::new(), results))
    }
}

/// Binary operation over two numbers `a` and `b`.
#[derive(Debug)]
pub struct Arithmetic {
    descriptor: NodeDescriptor,
    output: &'static str,
    op: fn(f64, f64) -> f64,
}

impl Arithmetic {
    fn new(name: &str, output: &'static str, display: &str, op: fn(f64, f64) -> f64) -> Self {
        let descriptor = NodeDescriptor::new(name)
            .input("a", DataType::Number, "A")
            .input("b", DataType::Number, "B")
            .output(output, DataType::Number, display);
        Self {
            descriptor,
            output,
            op,
        }
    }

    /// `Sum`: `a + b` as `sum`.
    pub fn sum() -> Self {
        Self::new("Sum", "sum", "Sum", |a, b| a + b)
    }

    /// `Multiplication`: `a * b` as `product`.
    pub fn multiplication() -> Self {
        Self::new("Multiplication", "product", "Product", |a, b| a * b)
    }
}

#[async_trait]
impl NodeType for Arithmetic {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(presence(self.descriptor.outputs.keys(), inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let a = inputs.number_value("a").unwrap_or_default();
        let b = inputs.number_value("b").unwrap_or_default();
        Ok(NodeOutput::new(IoValues::from([(
            self.output.to_owned(),
            json!((self.op)(a, b)),
        )])))
    }
}

/// Relation tested by [`Comparison`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonType {
    Equals,
    GreaterThen,
    LessThen,
}

impl ComparisonType {
    /// Returns whether `a` relates to `b`.
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Self::Equals => a == b,
            Self::GreaterThen => a > b,
            Self::LessThen => a < b,
        }
    }
}

fn comparison_type(form: &Form) -> Option<ComparisonType> {
    form.str_value("type")?.parse().ok()
}

/// Compares two numbers `a` and `b` by the relation in its `type` form field.
#[derive(Debug)]
pub struct Comparison(NodeDescriptor);

impl Default for Comparison {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("Comparison")
                .input("a", DataType::Number, "A")
                .input("b", DataType::Number, "B")
                .output("value", DataType::Boolean, "Value"),
        )
    }
}

#[async_trait]
impl NodeType for Comparison {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        comparison_type(form).is_some()
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
        inputs: &IoValues,
        _ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let a = inputs.number_value("a").unwrap_or_default();
        let b = inputs.number_value("b").unwrap_or_default();
        let holds = comparison_type(form).is_some_and(|t| t.holds(a, b));
        Ok(NodeOutput::new(IoValues::from([(
            "value".to_owned(),
            json!(holds),
        )])))
    }
}
