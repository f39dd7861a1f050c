//! Helpers shared by the built-in node types.

use calcflow_core::DatasetId;
use calcflow_core::types::{
    DataType, Dataset, DatasetRef, Entry, Form, FormExt, IoValues, MetaValue, OutputResult,
    SocketDef, SocketDefs, SocketMetas, ValueSchema, all_present,
};
use calcflow_runtime::engine::NodeContext;
use calcflow_runtime::node::NodeOutput;
use calcflow_runtime::{EngineError, EngineResult};
use serde_json::{Value, json};

use crate::TRACING_TARGET;

/// Name of the dataset socket of dataset-consuming nodes.
pub(crate) const DATASET: &str = "dataset";

/// One meta value per output, present if every input is.
pub(crate) fn presence<'a>(
    outputs: impl IntoIterator<Item = &'a String>,
    inputs: &SocketMetas,
) -> SocketMetas {
    let meta = if all_present(inputs) {
        MetaValue::present(json!({}))
    } else {
        MetaValue::absent()
    };
    outputs
        .into_iter()
        .map(|name| (name.clone(), meta.clone()))
        .collect()
}

/// Terminal nodes need a non-empty `name`.
pub(crate) fn is_output_form_valid(form: &Form) -> bool {
    form.str_value("name").is_some_and(|name| !name.is_empty())
}

/// Builds the result of a terminal node from its `name` and `description`.
pub(crate) fn output_result(
    form: &Form,
    value: Value,
    data_type: DataType,
    ctx: &NodeContext<'_>,
) -> OutputResult {
    OutputResult {
        name: form.str_value("name").unwrap_or_default().to_owned(),
        value,
        data_type,
        workspace_id: ctx.workspace_id(),
        description: form.str_value("description").unwrap_or_default().to_owned(),
    }
}

/// Meta content describing a dataset schema.
pub(crate) fn schema_content(schema: &[ValueSchema]) -> Value {
    json!({ "schema": schema })
}

/// Absent dataset meta with an empty schema.
pub(crate) fn absent_dataset() -> MetaValue {
    MetaValue {
        content: schema_content(&[]),
        is_present: false,
    }
}

/// Reads the dataset schema carried by the meta value of the dataset socket.
pub(crate) fn schema_of(inputs: &SocketMetas) -> Vec<ValueSchema> {
    inputs
        .get(DATASET)
        .and_then(|meta| meta.content.get("schema"))
        .and_then(|schema| serde_json::from_value(schema.clone()).ok())
        .unwrap_or_default()
}

/// One dynamic `ContextInput` socket per dataset column.
pub(crate) fn entry_context_inputs(inputs: &SocketMetas) -> SocketDefs {
    schema_of(inputs)
        .into_iter()
        .map(|column| {
            let def = SocketDef::dynamic(column.data_type, column.name.clone());
            (column.name, def)
        })
        .collect()
}

/// Reads the dataset reference of the dataset input.
pub(crate) fn dataset_input(inputs: &IoValues, node: &NodeContext<'_>) -> EngineResult<DatasetId> {
    inputs
        .get(DATASET)
        .and_then(DatasetRef::from_value)
        .map(|dataset| dataset.dataset_id)
        .ok_or_else(|| EngineError::node_failed(node.node().id, "dataset input is missing"))
}

/// Output holding a reference to `dataset_id` on the dataset socket.
pub(crate) fn dataset_output(dataset_id: DatasetId) -> NodeOutput {
    NodeOutput::new(IoValues::from([(
        DATASET.to_owned(),
        DatasetRef::new(dataset_id).to_value(),
    )]))
}

/// Stores `entries` as a new dataset derived from `source`.
pub(crate) async fn derive_dataset(
    ctx: &NodeContext<'_>,
    source: &Dataset,
    name: String,
    schema: Vec<ValueSchema>,
    entries: Vec<IoValues>,
) -> EngineResult<DatasetId> {
    let dataset = ctx
        .datasets()
        .create_dataset(Dataset::new(name, schema))
        .await?;
    let count = ctx.datasets().add_entries(dataset.id, entries).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        node_id = %ctx.node().id,
        source_id = %source.id,
        dataset_id = %dataset.id,
        entries = count,
        "Derived dataset created"
    );

    Ok(dataset.id)
}

/// Runs the nested scope once per entry of a dataset, in entry order.
///
/// `on_entry` receives each entry together with the values arriving at the
/// scope's `ContextOutput`. Progress is reported after every entry and reset
/// once all entries are processed.
pub(crate) async fn process_entries(
    ctx: &mut NodeContext<'_>,
    dataset_id: DatasetId,
    mut on_entry: impl FnMut(Entry, IoValues),
) -> EngineResult<()> {
    let entries = ctx.datasets().get_entries(dataset_id).await?;
    let total = entries.len();

    tracing::debug!(
        target: TRACING_TARGET,
        node_id = %ctx.node().id,
        dataset_id = %dataset_id,
        entries = total,
        "Processing entries"
    );

    for (i, entry) in entries.into_iter().enumerate() {
        let outputs = ctx.invoke_context(entry.values.clone()).await?;
        on_entry(entry, outputs);
        ctx.set_progress(Some((i + 1) as f64 / total as f64))
            .await?;
    }

    ctx.set_progress(None).await
}
