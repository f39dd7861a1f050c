//! Dataset source, sink and projection nodes.

use async_trait::async_trait;
use calcflow_core::DatasetId;
use calcflow_core::types::{DataType, DatasetRef, Form, FormExt, IoValues, MetaValue, SocketMetas};
use calcflow_runtime::{EngineError, EngineResult};
use calcflow_runtime::engine::{MetaContext, NodeContext};
use calcflow_runtime::node::{NodeDescriptor, NodeOutput, NodeType};
use serde_json::Value;

use crate::TRACING_TARGET;
use crate::util::{
    DATASET, absent_dataset, dataset_input, dataset_output, derive_dataset, is_output_form_valid,
    output_result, schema_content, schema_of,
};

/// Reads the dataset id selected in the `dataset` form field.
fn selected_dataset(form: &Form) -> Option<DatasetId> {
    form.str_value(DATASET)?.parse().ok()
}

/// Emits a reference to a stored dataset.
///
/// The meta value carries the dataset schema, which downstream context
/// nodes turn into the sockets of their scope.
#[derive(Debug)]
pub struct DatasetInput(NodeDescriptor);

impl Default for DatasetInput {
    fn default() -> Self {
        Self(NodeDescriptor::new("DatasetInput").output(DATASET, DataType::Dataset, "Dataset"))
    }
}

#[async_trait]
impl NodeType for DatasetInput {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        selected_dataset(form).is_some()
    }

    async fn on_meta_execution(
        &self,
        form: &Form,
        _inputs: &SocketMetas,
        ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        let Some(dataset_id) = selected_dataset(form) else {
            return Ok(SocketMetas::from([(DATASET.to_owned(), absent_dataset())]));
        };

        let meta = match ctx.datasets().get_dataset(dataset_id).await {
            Ok(dataset) => MetaValue::present(schema_content(&dataset.schema)),
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    node_id = %ctx.node().id,
                    dataset_id = %dataset_id,
                    "Selected dataset does not exist"
                );
                absent_dataset()
            }
            Err(err) => return Err(err.into()),
        };
        Ok(SocketMetas::from([(DATASET.to_owned(), meta)]))
    }

    async fn on_node_execution(
        &self,
        form: &Form,
        _inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let node_id = ctx.node().id;
        let dataset_id =
            selected_dataset(form).ok_or(EngineError::FormOrInputsMissing { node_id })?;
        let dataset = ctx.datasets().get_dataset(dataset_id).await?;
        Ok(NodeOutput::new(IoValues::from([(
            DATASET.to_owned(),
            DatasetRef::new(dataset.id).to_value(),
        )])))
    }
}

/// Publishes a dataset as a named result.
#[derive(Debug)]
pub struct DatasetOutput(NodeDescriptor);

impl Default for DatasetOutput {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("DatasetOutput")
                .input(DATASET, DataType::Dataset, "Dataset")
                .terminal(),
        )
    }
}

#[async_trait]
impl NodeType for DatasetOutput {
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
        let dataset_id = dataset_input(inputs, ctx)?;
        let value = DatasetRef::new(dataset_id).to_value();
        let results = output_result(form, value, DataType::Dataset, ctx);
        Ok(NodeOutput::with_results(IoValues::new(), results))
    }
}

/// Reads the column names listed in the `values` form field.
fn selected_columns(form: &Form) -> Option<Vec<&str>> {
    let columns = form.get("values")?.as_array()?;
    let columns: Option<Vec<&str>> = columns.iter().map(Value::as_str).collect();
    columns.filter(|c| !c.is_empty())
}

/// Narrows a dataset to the columns selected in its `values` form field.
///
/// Selected names that the dataset does not have are ignored.
#[derive(Debug)]
pub struct SelectValues(NodeDescriptor);

impl Default for SelectValues {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("SelectValues")
                .input(DATASET, DataType::Dataset, "Dataset")
                .output(DATASET, DataType::Dataset, "Dataset"),
        )
    }
}

#[async_trait]
impl NodeType for SelectValues {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        selected_columns(form).is_some()
    }

    async fn on_meta_execution(
        &self,
        form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        let meta = match (inputs.get(DATASET), selected_columns(form)) {
            (Some(meta), Some(columns)) if meta.is_present => {
                let schema: Vec<_> = schema_of(inputs)
                    .into_iter()
                    .filter(|c| columns.contains(&c.name.as_str()))
                    .collect();
                MetaValue::present(schema_content(&schema))
            }
            _ => absent_dataset(),
        };
        Ok(SocketMetas::from([(DATASET.to_owned(), meta)]))
    }

    async fn on_node_execution(
        &self,
        form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let node_id = ctx.node().id;
        let columns = selected_columns(form).ok_or(EngineError::FormOrInputsMissing { node_id })?;
        let dataset_id = dataset_input(inputs, ctx)?;
        let source = ctx.datasets().get_dataset(dataset_id).await?;

        let schema = source
            .schema
            .iter()
            .filter(|c| columns.contains(&c.name.as_str()))
            .cloned()
            .collect();
        let entries = ctx
            .datasets()
            .get_entries(dataset_id)
            .await?
            .into_iter()
            .map(|entry| {
                entry
                    .values
                    .into_iter()
                    .filter(|(name, _)| columns.contains(&name.as_str()))
                    .collect()
            })
            .collect();

        let name = format!("{} (selected)", source.name);
        let dataset_id = derive_dataset(ctx, &source, name, schema, entries).await?;
        Ok(dataset_output(dataset_id))
    }
}
