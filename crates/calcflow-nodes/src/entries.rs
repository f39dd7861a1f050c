//! Nodes transforming the entries of a dataset through a nested scope.

use async_trait::async_trait;
use calcflow_core::types::{
    DataType, Form, FormExt, IoValues, MetaValue, SocketDef, SocketDefs, SocketMetas, all_present,
};
use calcflow_runtime::engine::{MetaContext, NodeContext};
use calcflow_runtime::node::{ContextDefinition, NodeDescriptor, NodeOutput, NodeType};
use calcflow_runtime::{EngineError, EngineResult};
use serde_json::json;
use strum::{Display, EnumIter, EnumString};

use crate::TRACING_TARGET;
use crate::util::{
    DATASET, absent_dataset, dataset_input, dataset_output, derive_dataset, entry_context_inputs,
    process_entries, schema_of,
};

fn descriptor(name: &str) -> NodeDescriptor {
    NodeDescriptor::new(name)
        .input(DATASET, DataType::Dataset, "Dataset")
        .output(DATASET, DataType::Dataset, "Dataset")
}

/// The output dataset has the schema of the input dataset.
fn pass_dataset(inputs: &SocketMetas) -> SocketMetas {
    let meta = match inputs.get(DATASET) {
        Some(meta) if all_present(inputs) => meta.clone(),
        _ => absent_dataset(),
    };
    SocketMetas::from([(DATASET.to_owned(), meta)])
}

/// Keeps the entries for which the scope yields `keepEntry == true`.
#[derive(Debug)]
pub struct FilterEntries(NodeDescriptor);

impl Default for FilterEntries {
    fn default() -> Self {
        Self(descriptor("FilterEntries"))
    }
}

impl ContextDefinition for FilterEntries {
    fn context_input_defs(&self, _input_defs: &SocketDefs, inputs: &SocketMetas) -> SocketDefs {
        entry_context_inputs(inputs)
    }

    fn context_output_defs(
        &self,
        _inputs: &SocketMetas,
        _context_inputs: &SocketDefs,
    ) -> SocketDefs {
        SocketDefs::from([(
            "keepEntry".to_owned(),
            SocketDef::new(DataType::Boolean, "Keep entry"),
        )])
    }
}

#[async_trait]
impl NodeType for FilterEntries {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_dataset(inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let dataset_id = dataset_input(inputs, ctx)?;
        let source = ctx.datasets().get_dataset(dataset_id).await?;

        let mut kept = Vec::new();
        process_entries(ctx, dataset_id, |entry, outputs| {
            if outputs.bool_value("keepEntry") == Some(true) {
                kept.push(entry.values);
            }
        })
        .await?;

        let name = format!("{} (filtered)", source.name);
        let dataset_id = derive_dataset(ctx, &source, name, source.schema.clone(), kept).await?;
        Ok(dataset_output(dataset_id))
    }

    fn context(&self) -> Option<&dyn ContextDefinition> {
        Some(self)
    }
}

/// Rewrites the entries of a dataset.
///
/// The scope receives every column of an entry and may produce a new value
/// for each of them. The scope outputs are optional: columns left
/// unconnected keep their original value.
#[derive(Debug)]
pub struct EditEntries(NodeDescriptor);

impl Default for EditEntries {
    fn default() -> Self {
        Self(descriptor("EditEntries"))
    }
}

impl ContextDefinition for EditEntries {
    fn context_input_defs(&self, _input_defs: &SocketDefs, inputs: &SocketMetas) -> SocketDefs {
        entry_context_inputs(inputs)
    }

    fn context_output_defs(
        &self,
        _inputs: &SocketMetas,
        context_inputs: &SocketDefs,
    ) -> SocketDefs {
        context_inputs
            .iter()
            .map(|(name, def)| (name.clone(), def.clone().optional()))
            .collect()
    }
}

#[async_trait]
impl NodeType for EditEntries {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    async fn on_meta_execution(
        &self,
        _form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        Ok(pass_dataset(inputs))
    }

    async fn on_node_execution(
        &self,
        _form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let dataset_id = dataset_input(inputs, ctx)?;
        let source = ctx.datasets().get_dataset(dataset_id).await?;

        let mut edited = Vec::new();
        process_entries(ctx, dataset_id, |entry, outputs| {
            let mut values = entry.values;
            values.extend(outputs);
            edited.push(values);
        })
        .await?;

        let name = format!("{} (edited)", source.name);
        let dataset_id = derive_dataset(ctx, &source, name, source.schema.clone(), edited).await?;
        Ok(dataset_output(dataset_id))
    }

    fn context(&self) -> Option<&dyn ContextDefinition> {
        Some(self)
    }
}

/// Reduction applied by [`AggregateEntries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Display, EnumIter, EnumString)]
pub enum AggregationType {
    #[strum(serialize = "Sum")]
    Sum,
    #[strum(serialize = "Average")]
    Average,
    #[strum(serialize = "Min")]
    Min,
    #[strum(serialize = "Max")]
    Max,
    #[strum(serialize = "Median")]
    Median,
}

impl AggregationType {
    /// Reduces `values`; only `Sum` is defined for an empty slice.
    pub fn apply(self, values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return (self == Self::Sum).then_some(0.0);
        }

        let value = match self {
            Self::Sum => values.iter().sum(),
            Self::Average => values.iter().sum::<f64>() / values.len() as f64,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        };
        Some(value)
    }
}

fn aggregation(form: &Form) -> Option<AggregationType> {
    form.str_value("type")?.parse().ok()
}

/// Reduces one numeric column of a dataset to a single number.
///
/// The column is named by the `valueName` form field and the reduction by
/// `type`. Entries without a number in that column are skipped.
#[derive(Debug)]
pub struct AggregateEntries(NodeDescriptor);

impl Default for AggregateEntries {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("AggregateEntries")
                .input(DATASET, DataType::Dataset, "Dataset")
                .output("value", DataType::Number, "Value"),
        )
    }
}

#[async_trait]
impl NodeType for AggregateEntries {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        form.str_value("valueName").is_some_and(|name| !name.is_empty())
            && aggregation(form).is_some()
    }

    async fn on_meta_execution(
        &self,
        form: &Form,
        inputs: &SocketMetas,
        _ctx: &MetaContext<'_>,
    ) -> EngineResult<SocketMetas> {
        let column = form.str_value("valueName");
        let is_numeric = schema_of(inputs)
            .iter()
            .any(|c| Some(c.name.as_str()) == column && c.data_type == DataType::Number);
        let meta = if all_present(inputs) && is_numeric {
            MetaValue::present(json!({}))
        } else {
            MetaValue::absent()
        };
        Ok(SocketMetas::from([("value".to_owned(), meta)]))
    }

    async fn on_node_execution(
        &self,
        form: &Form,
        inputs: &IoValues,
        ctx: &mut NodeContext<'_>,
    ) -> EngineResult<NodeOutput> {
        let node_id = ctx.node().id;
        let (Some(column), Some(aggregation)) = (form.str_value("valueName"), aggregation(form))
        else {
            return Err(EngineError::FormOrInputsMissing { node_id });
        };

        let dataset_id = dataset_input(inputs, ctx)?;
        let entries = ctx.datasets().get_entries(dataset_id).await?;
        let mut values: Vec<f64> = entries
            .iter()
            .filter_map(|entry| entry.values.number_value(column))
            .collect();

        tracing::debug!(
            target: TRACING_TARGET,
            node_id = %node_id,
            dataset_id = %dataset_id,
            aggregation = %aggregation,
            values = values.len(),
            "Aggregating entries"
        );

        let value = aggregation.apply(&mut values).ok_or_else(|| {
            EngineError::node_failed(node_id, format!("no values to aggregate in `{column}`"))
        })?;
        Ok(NodeOutput::new(IoValues::from([(
            "value".to_owned(),
            json!(value),
        )])))
    }
}
