//! Node type capabilities.
//!
//! A node type is a bundle of callbacks keyed by a unique name. Plain types
//! only implement [`NodeType`]; context-providing types additionally expose a
//! [`ContextDefinition`] describing the sockets of their nested scope.

use async_trait::async_trait;
use calcflow_core::types::{
    DataType, Form, IoValues, OutputResult, SocketDef, SocketDefs, SocketMetas,
};

use crate::engine::{MetaContext, NodeContext};
use crate::error::EngineResult;

/// Static description of a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    /// Unique type name, e.g. `"NumberInput"`.
    pub name: String,
    /// Declared input sockets.
    pub inputs: SocketDefs,
    /// Declared output sockets.
    pub outputs: SocketDefs,
    /// Whether instances are terminal nodes producing results.
    pub is_output: bool,
}

impl NodeDescriptor {
    /// Creates a descriptor without sockets.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: SocketDefs::new(),
            outputs: SocketDefs::new(),
            is_output: false,
        }
    }

    /// Adds a static input socket.
    pub fn input(mut self, name: impl Into<String>, data_type: DataType, display: &str) -> Self {
        self.inputs
            .insert(name.into(), SocketDef::new(data_type, display));
        self
    }

    /// Adds a static output socket.
    pub fn output(mut self, name: impl Into<String>, data_type: DataType, display: &str) -> Self {
        self.outputs
            .insert(name.into(), SocketDef::new(data_type, display));
        self
    }

    /// Marks the type as terminal.
    pub fn terminal(mut self) -> Self {
        self.is_output = true;
        self
    }
}

/// Values produced by one node execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutput {
    /// Values keyed by output socket.
    pub outputs: IoValues,
    /// Externally consumed result of terminal nodes.
    pub results: Option<OutputResult>,
}

impl NodeOutput {
    /// Output without a result.
    pub fn new(outputs: IoValues) -> Self {
        Self {
            outputs,
            results: None,
        }
    }

    /// Output of a terminal node.
    pub fn with_results(outputs: IoValues, results: OutputResult) -> Self {
        Self {
            outputs,
            results: Some(results),
        }
    }
}

/// Behavior of a node type.
#[async_trait]
pub trait NodeType: Send + Sync {
    /// Returns the static description of this type.
    fn descriptor(&self) -> &NodeDescriptor;

    /// Returns whether the parsed form is complete.
    fn is_form_valid(&self, _form: &Form) -> bool {
        true
    }

    /// Additional type-specific check of the resolved inputs.
    ///
    /// Runs after every declared input passed its data type check.
    fn is_input_valid(&self, _inputs: &IoValues) -> bool {
        true
    }

    /// Propagates meta values from inputs to outputs without side effects.
    async fn on_meta_execution(
        &self,
        form: &Form,
        inputs: &SocketMetas,
        ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas>;

    /// Computes the real outputs of a node.
    async fn on_node_execution(
        &self,
        form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput>;

    /// Returns the nested scope definition of context-providing types.
    fn context(&self) -> Option<&dyn ContextDefinition> {
        None
    }
}

/// Socket transforms of a context-providing node type.
pub trait ContextDefinition: Send + Sync {
    /// Derives the outputs of the scope's `ContextInput` from the owner's
    /// resolved input metas.
    fn context_input_defs(&self, input_defs: &SocketDefs, inputs: &SocketMetas) -> SocketDefs;

    /// Derives the inputs of the scope's `ContextOutput`.
    fn context_output_defs(
        &self,
        inputs: &SocketMetas,
        context_inputs: &SocketDefs,
    ) -> SocketDefs;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = NodeDescriptor::new("Sum")
            .input("a", DataType::Number, "A")
            .input("b", DataType::Number, "B")
            .output("sum", DataType::Number, "Sum");

        assert_eq!(descriptor.name, "Sum");
        assert_eq!(descriptor.inputs.len(), 2);
        assert_eq!(descriptor.outputs["sum"].data_type, DataType::Number);
        assert!(!descriptor.is_output);
        assert!(NodeDescriptor::new("Out").terminal().is_output);
    }
}
