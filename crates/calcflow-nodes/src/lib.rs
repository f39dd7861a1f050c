#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod boolean;
mod dataset;
mod entries;
mod number;
mod string;
mod util;
mod visualization;

#[cfg(test)]
mod tests;

use calcflow_runtime::RegistryError;
use calcflow_runtime::registry::NodeRegistry;

pub use crate::boolean::EqualsString;
pub use crate::dataset::{DatasetInput, DatasetOutput, SelectValues};
pub use crate::entries::{AggregateEntries, AggregationType, EditEntries, FilterEntries};
pub use crate::number::{Arithmetic, Comparison, ComparisonType, NumberInput, NumberOutput};
pub use crate::string::{StringInput, StringOutput};
pub use crate::visualization::{
    BarChart, BarChartType, Cities, City, Passage, SoundChart, SoundChartValues,
};

/// Tracing target for built-in node types.
pub const TRACING_TARGET: &str = "calcflow_nodes";

/// Registers every built-in node type.
///
/// Fails if one of the names is already taken in `registry`.
pub fn register_builtin_nodes(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(StringInput::default())?;
    registry.register(StringOutput::default())?;
    registry.register(NumberInput::default())?;
    registry.register(NumberOutput::default())?;
    registry.register(Arithmetic::sum())?;
    registry.register(Arithmetic::multiplication())?;
    registry.register(Comparison::default())?;
    registry.register(EqualsString::default())?;
    registry.register(DatasetInput::default())?;
    registry.register(DatasetOutput::default())?;
    registry.register(SelectValues::default())?;
    registry.register(FilterEntries::default())?;
    registry.register(EditEntries::default())?;
    registry.register(AggregateEntries::default())?;
    registry.register(BarChart::default())?;
    registry.register(SoundChart::default())?;

    tracing::debug!(
        target: TRACING_TARGET,
        node_types = registry.len(),
        "Built-in node types registered"
    );

    Ok(())
}
