//! Visualization nodes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use calcflow_core::types::{DataType, Form, FormExt, IoValues, SocketDef, SocketDefs, SocketMetas};
use calcflow_runtime::EngineResult;
use calcflow_runtime::engine::{MetaContext, NodeContext};
use calcflow_runtime::node::{ContextDefinition, NodeDescriptor, NodeOutput, NodeType};
use serde::Serialize;
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumString};

use crate::util::{
    DATASET, dataset_input, entry_context_inputs, is_output_form_valid, output_result,
    process_entries,
};

/// Orientation of a bar chart.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum BarChartType {
    /// Vertical bars.
    #[default]
    Column,
    /// Horizontal bars.
    Bar,
}

fn chart_type(form: &Form) -> Option<BarChartType> {
    form.str_value("type")?.parse().ok()
}

/// Maps every dataset entry to a labelled bar.
///
/// The scope computes `label` and `value` per entry; the chart keeps the
/// entry order.
#[derive(Debug)]
pub struct BarChart(NodeDescriptor);

impl Default for BarChart {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("BarChart")
                .input(DATASET, DataType::Dataset, "Dataset")
                .terminal(),
        )
    }
}

impl ContextDefinition for BarChart {
    fn context_input_defs(&self, _input_defs: &SocketDefs, inputs: &SocketMetas) -> SocketDefs {
        entry_context_inputs(inputs)
    }

    fn context_output_defs(
        &self,
        _inputs: &SocketMetas,
        _context_inputs: &SocketDefs,
    ) -> SocketDefs {
        SocketDefs::from([
            ("label".to_owned(), SocketDef::new(DataType::String, "Label")),
            ("value".to_owned(), SocketDef::new(DataType::Number, "Value")),
        ])
    }
}

#[async_trait]
impl NodeType for BarChart {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.0
    }

    fn is_form_valid(&self, form: &Form) -> bool {
        is_output_form_valid(form) && chart_type(form).is_some()
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

        let mut values = Vec::new();
        process_entries(ctx, dataset_id, |_, outputs| {
            values.push(json!({
                "label": outputs.get("label").cloned().unwrap_or(Value::Null),
                "value": outputs.get("value").cloned().unwrap_or(Value::Null),
            }));
        })
        .await?;

        let chart = json!({
            "type": chart_type(form).unwrap_or_default().as_ref(),
            "values": values,
        });
        let results = output_result(form, chart, DataType::Custom, ctx);
        Ok(NodeOutput::with_results(IoValues::new(), results))
    }

    fn context(&self) -> Option<&dyn ContextDefinition> {
        Some(self)
    }
}

/// Trade volumes of one city in a sound chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub import_volume: f64,
    pub export_volume: f64,
    pub is_west: bool,
    pub sorting_value: f64,
}

/// One directed flow between two cities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    pub source: String,
    pub destination: String,
    pub is_east_passage: bool,
    pub value: f64,
}

/// Cities split by side, plus the passages in entry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SoundChartValues {
    pub cities: Cities,
    pub passages: Vec<Passage>,
}

/// Cities keyed by name on either side of the chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cities {
    pub east: BTreeMap<String, City>,
    pub west: BTreeMap<String, City>,
}

impl SoundChartValues {
    /// Folds passages into per-city volumes.
    ///
    /// A passage from west to east puts its source in the west and its
    /// destination in the east, and the other way round otherwise. The last
    /// passage touching a city decides its side and sorting value.
    pub fn from_passages(passages: Vec<(Passage, f64)>) -> Self {
        let mut cities: BTreeMap<String, City> = BTreeMap::new();
        for (passage, sorting_value) in &passages {
            let source = cities.entry(passage.source.clone()).or_default();
            source.export_volume += passage.value;
            source.is_west = passage.is_east_passage;
            source.sorting_value = *sorting_value;

            let destination = cities.entry(passage.destination.clone()).or_default();
            destination.import_volume += passage.value;
            destination.is_west = !passage.is_east_passage;
            destination.sorting_value = *sorting_value;
        }

        let (west, east) = cities.into_iter().partition(|(_, city)| city.is_west);
        Self {
            cities: Cities { east, west },
            passages: passages.into_iter().map(|(passage, _)| passage).collect(),
        }
    }
}

/// Reads one passage from the values arriving at the scope exit.
fn passage(outputs: &IoValues) -> (Passage, f64) {
    let passage = Passage {
        source: outputs.str_value("source").unwrap_or_default().to_owned(),
        destination: outputs.str_value("destination").unwrap_or_default().to_owned(),
        is_east_passage: outputs.bool_value("fromWestToEast").unwrap_or_default(),
        value: outputs.number_value("value").unwrap_or_default(),
    };
    let sorting_value = outputs.number_value("sortingValue").unwrap_or_default();
    (passage, sorting_value)
}

/// Maps every dataset entry to a passage between two cities.
///
/// The scope computes `source`, `destination`, `fromWestToEast`,
/// `sortingValue` and `value` per entry. The result sums import and export
/// volumes per city and keeps the passages in entry order.
#[derive(Debug)]
pub struct SoundChart(NodeDescriptor);

impl Default for SoundChart {
    fn default() -> Self {
        Self(
            NodeDescriptor::new("SoundChart")
                .input(DATASET, DataType::Dataset, "Dataset")
                .terminal(),
        )
    }
}

impl ContextDefinition for SoundChart {
    fn context_input_defs(&self, _input_defs: &SocketDefs, inputs: &SocketMetas) -> SocketDefs {
        entry_context_inputs(inputs)
    }

    fn context_output_defs(
        &self,
        _inputs: &SocketMetas,
        _context_inputs: &SocketDefs,
    ) -> SocketDefs {
        SocketDefs::from([
            ("source".to_owned(), SocketDef::new(DataType::String, "Source")),
            (
                "destination".to_owned(),
                SocketDef::new(DataType::String, "Destination"),
            ),
            (
                "fromWestToEast".to_owned(),
                SocketDef::new(DataType::Boolean, "Is from West to East"),
            ),
            (
                "sortingValue".to_owned(),
                SocketDef::new(DataType::Number, "Sorting Value"),
            ),
            ("value".to_owned(), SocketDef::new(DataType::Number, "Value")),
        ])
    }
}

#[async_trait]
impl NodeType for SoundChart {
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

        let mut passages = Vec::new();
        process_entries(ctx, dataset_id, |_, outputs| passages.push(passage(&outputs))).await?;

        let chart = json!({
            "type": "SoundChart",
            "values": SoundChartValues::from_passages(passages),
        });
        let results = output_result(form, chart, DataType::Custom, ctx);
        Ok(NodeOutput::with_results(IoValues::new(), results))
    }

    fn context(&self) -> Option<&dyn ContextDefinition> {
        Some(self)
    }
}
