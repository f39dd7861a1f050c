//! Built-in nodes executed through the engine over an in-memory store.

use std::sync::Arc;

use calcflow_core::port::{DatasetRepository, GraphRepository};
use calcflow_core::types::{
    ConnectionInstance, ContextBoundary, DataType, Dataset, DatasetRef, IoValues, NodeInstance,
    NodeState, SocketRef, ValueSchema,
};
use calcflow_core::{DatasetId, NodeId, WorkspaceId};
use calcflow_memory::MemoryStore;
use calcflow_runtime::engine::{Engine, EngineConfig};
use calcflow_runtime::registry::NodeRegistry;
use calcflow_runtime::{EngineError, RegistryError};
use serde_json::{Value, json};

use crate::register_builtin_nodes;

struct Harness {
    store: MemoryStore,
    engine: Engine,
    workspace_id: WorkspaceId,
}

impl Harness {
    async fn new() -> Self {
        let mut registry = NodeRegistry::new();
        register_builtin_nodes(&mut registry).unwrap();

        let store = MemoryStore::new();
        let workspace = store.create_workspace("test", "").await;
        let engine = Engine::new(
            Arc::new(registry),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            EngineConfig::default(),
        );

        Self {
            store,
            engine,
            workspace_id: workspace.id,
        }
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

    async fn form(&self, node: &NodeInstance, name: &str, raw: &str) {
        self.engine
            .editor()
            .add_or_update_form_value(node.id, name, raw)
            .await
            .unwrap();
    }

    async fn connect(&self, from: &NodeInstance, output: &str, to: &NodeInstance, input: &str) {
        self.engine
            .editor()
            .create_connection(SocketRef::new(from.id, output), SocketRef::new(to.id, input))
            .await
            .unwrap();
    }

    async fn boundary(&self, owner: &NodeInstance, boundary: ContextBoundary) -> NodeInstance {
        self.store.get_context_node(owner, boundary).await.unwrap()
    }

    async fn dataset(&self, schema: Vec<ValueSchema>, entries: Vec<Value>) -> DatasetId {
        let dataset = self
            .store
            .create_dataset(Dataset::new("test", schema))
            .await
            .unwrap();
        let entries = entries
            .into_iter()
            .map(|entry| serde_json::from_value::<IoValues>(entry).unwrap())
            .collect();
        self.store.add_entries(dataset.id, entries).await.unwrap();
        dataset.id
    }

    /// `DatasetInput` selecting `dataset_id`.
    async fn dataset_input(&self, dataset_id: DatasetId) -> NodeInstance {
        let node = self.node("DatasetInput").await;
        self.form(&node, "dataset", &json!(dataset_id).to_string())
            .await;
        node
    }
}

fn result_dataset(value: &Value) -> DatasetId {
    DatasetRef::from_value(value).unwrap().dataset_id
}

#[test]
fn test_register_builtin_nodes() {
    let mut registry = NodeRegistry::new();
    register_builtin_nodes(&mut registry).unwrap();
    assert_eq!(registry.len(), 16);
    assert!(registry.is_output("SoundChart"));
    assert!(registry.contains("EditEntries"));
    assert!(registry.is_output("BarChart"));
    assert!(!registry.is_output("Sum"));

    let err = register_builtin_nodes(&mut registry).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateNodeType("StringInput".into()));
}

#[tokio::test]
async fn test_execute_simple_node() {
    let h = Harness::new().await;
    let node = h.node("StringInput").await;
    h.form(&node, "value", "\"test\"").await;

    let output = h.engine.execute_node(node.id).await.unwrap();
    assert_eq!(output.outputs.len(), 1);
    assert_eq!(output.outputs["value"], json!("test"));
    assert!(output.results.is_none());
}

#[tokio::test]
async fn test_execute_connected_nodes() {
    let h = Harness::new().await;
    let input = h.node("StringInput").await;
    let output = h.node("StringOutput").await;
    h.connect(&input, "value", &output, "value").await;
    h.form(&input, "value", "\"test\"").await;
    h.form(&output, "name", "\"test\"").await;

    let executed = h.engine.execute_node(output.id).await.unwrap();
    assert!(executed.outputs.is_empty());
    let results = executed.results.unwrap();
    assert_eq!(results.value, json!("test"));
    assert_eq!(results.name, "test");
    assert_eq!(results.data_type, DataType::String);
}

#[tokio::test]
async fn test_sum_of_inputs() {
    let h = Harness::new().await;
    let a = h.node("NumberInput").await;
    let b = h.node("NumberInput").await;
    let sum = h.node("Sum").await;
    let output = h.node("NumberOutput").await;
    h.form(&a, "value", "18").await;
    h.form(&b, "value", "81").await;
    h.form(&output, "name", "\"test\"").await;
    h.connect(&a, "value", &sum, "a").await;
    h.connect(&b, "value", &sum, "b").await;
    h.connect(&sum, "sum", &output, "value").await;

    let stored = h.store.get_node(output.id).await.unwrap();
    assert_eq!(stored.state, NodeState::Valid);

    let executed = h.engine.execute_node(output.id).await.unwrap();
    assert_eq!(executed.results.unwrap().value, json!(99.0));
}

#[tokio::test]
async fn test_multiplication_and_string_equality() {
    let h = Harness::new().await;
    let a = h.node("NumberInput").await;
    let b = h.node("NumberInput").await;
    let product = h.node("Multiplication").await;
    h.form(&a, "value", "6").await;
    h.form(&b, "value", "7").await;
    h.connect(&a, "value", &product, "a").await;
    h.connect(&b, "value", &product, "b").await;
    let executed = h.engine.execute_node(product.id).await.unwrap();
    assert_eq!(executed.outputs["product"], json!(42.0));

    let x = h.node("StringInput").await;
    let y = h.node("StringInput").await;
    let equals = h.node("EqualsString").await;
    h.form(&x, "value", "\"abc\"").await;
    h.form(&y, "value", "abc").await;
    h.connect(&x, "value", &equals, "valueA").await;
    h.connect(&y, "value", &equals, "valueB").await;
    let executed = h.engine.execute_node(equals.id).await.unwrap();
    assert_eq!(executed.outputs["equals"], json!(true));
}

#[tokio::test]
async fn test_invalid_form() {
    let h = Harness::new().await;
    let node = h.node("NumberInput").await;
    h.form(&node, "value", "{NaN").await;

    let err = h.engine.execute_node(node.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Form values or inputs are missing");
}

#[tokio::test]
async fn test_invalid_input() {
    let h = Harness::new().await;
    let text = h.node("StringInput").await;
    let output = h.node("NumberOutput").await;
    h.form(&text, "value", "NaN").await;
    h.form(&output, "name", "\"test\"").await;

    // The editor refuses STRING -> NUMBER, so the edge goes straight to the store.
    let edge = ConnectionInstance::new(
        SocketRef::new(text.id, "value"),
        SocketRef::new(output.id, "value"),
        vec![],
    );
    h.store.insert_connection(edge).await.unwrap();

    let err = h.engine.execute_node(output.id).await.unwrap_err();
    assert!(matches!(err, EngineError::FormOrInputsMissing { node_id } if node_id == output.id));
}

#[tokio::test]
async fn test_dataset_input_meta() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(vec![ValueSchema::new("val", DataType::String)], vec![])
        .await;

    let input = h.dataset_input(dataset_id).await;
    let metas = h.engine.meta_outputs(input.id).await.unwrap();
    assert!(metas["dataset"].is_present);
    assert_eq!(metas["dataset"].content["schema"][0]["name"], json!("val"));

    let missing = h.dataset_input(DatasetId::new()).await;
    let metas = h.engine.meta_outputs(missing.id).await.unwrap();
    assert!(!metas["dataset"].is_present);
    assert_eq!(metas["dataset"].content, json!({ "schema": [] }));

    let filter = h.node("FilterEntries").await;
    h.connect(&missing, "dataset", &filter, "dataset").await;
    assert!(!h.engine.is_node_in_meta_valid(filter.id).await.unwrap());
    assert!(h.engine.context_input_defs(filter.id).await.unwrap().is_empty());

    h.connect(&input, "dataset", &filter, "dataset").await;
    let defs = h.engine.context_input_defs(filter.id).await.unwrap();
    assert_eq!(defs["val"].data_type, DataType::String);
    let defs = h.engine.context_output_defs(filter.id).await.unwrap();
    assert_eq!(defs["keepEntry"].data_type, DataType::Boolean);
}

#[tokio::test]
async fn test_edit_entries_through_context() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(
            vec![ValueSchema::new("val", DataType::String)],
            vec![json!({ "val": "old" })],
        )
        .await;

    let edit = h.node("EditEntries").await;
    let input = h.dataset_input(dataset_id).await;
    let output = h.node("DatasetOutput").await;

    // The scope exit accepts `val` before the dataset is connected.
    let context_output = h.boundary(&edit, ContextBoundary::Output).await;
    let replacement = h.node_in("StringInput", vec![edit.id]).await;
    h.connect(&replacement, "value", &context_output, "val").await;
    h.form(&replacement, "value", "\"test\"").await;
    h.form(&output, "name", "test").await;
    h.connect(&input, "dataset", &edit, "dataset").await;
    h.connect(&edit, "dataset", &output, "dataset").await;

    assert!(h.engine.is_node_in_meta_valid(edit.id).await.unwrap());

    let executed = h.engine.execute_node(output.id).await.unwrap();
    let results = executed.results.unwrap();
    assert_eq!(results.data_type, DataType::Dataset);

    let new_id = result_dataset(&results.value);
    assert_ne!(new_id, dataset_id);
    let entries = h.store.get_entries(new_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].values["val"], json!("test"));

    let stored = h.store.get_node(edit.id).await.unwrap();
    assert_eq!(stored.progress, None);
    assert_eq!(h.store.stats().progress_writes(), 2);
}

#[tokio::test]
async fn test_filter_entries_keeps_matching() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(
            vec![
                ValueSchema::new("label", DataType::String),
                ValueSchema::new("amount", DataType::Number),
            ],
            vec![
                json!({ "label": "a", "amount": 1 }),
                json!({ "label": "b", "amount": 2 }),
                json!({ "label": "a", "amount": 3 }),
            ],
        )
        .await;

    let input = h.dataset_input(dataset_id).await;
    let filter = h.node("FilterEntries").await;
    h.connect(&input, "dataset", &filter, "dataset").await;

    let context_input = h.boundary(&filter, ContextBoundary::Input).await;
    let context_output = h.boundary(&filter, ContextBoundary::Output).await;
    let wanted = h.node_in("StringInput", vec![filter.id]).await;
    let equals = h.node_in("EqualsString", vec![filter.id]).await;
    h.form(&wanted, "value", "\"a\"").await;
    h.connect(&context_input, "label", &equals, "valueA").await;
    h.connect(&wanted, "value", &equals, "valueB").await;
    h.connect(&equals, "equals", &context_output, "keepEntry").await;
    assert!(h.engine.is_node_in_meta_valid(filter.id).await.unwrap());

    let executed = h.engine.execute_node(filter.id).await.unwrap();
    let filtered = result_dataset(&executed.outputs["dataset"]);
    let entries = h.store.get_entries(filtered).await.unwrap();
    let amounts: Vec<_> = entries.iter().map(|e| e.values["amount"].clone()).collect();
    assert_eq!(amounts, vec![json!(1), json!(3)]);

    let dataset = h.store.get_dataset(filtered).await.unwrap();
    assert_eq!(dataset.name, "test (filtered)");
    assert_eq!(dataset.schema.len(), 2);
}

#[tokio::test]
async fn test_bar_chart_keeps_entry_order() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(
            vec![
                ValueSchema::new("label", DataType::String),
                ValueSchema::new("amount", DataType::Number),
            ],
            vec![
                json!({ "label": "x", "amount": 3 }),
                json!({ "label": "y", "amount": 1 }),
            ],
        )
        .await;

    let input = h.dataset_input(dataset_id).await;
    let chart = h.node("BarChart").await;
    h.form(&chart, "name", "\"Chart\"").await;
    h.form(&chart, "type", "\"bar\"").await;
    h.connect(&input, "dataset", &chart, "dataset").await;

    let context_input = h.boundary(&chart, ContextBoundary::Input).await;
    let context_output = h.boundary(&chart, ContextBoundary::Output).await;
    h.connect(&context_input, "label", &context_output, "label").await;
    h.connect(&context_input, "amount", &context_output, "value").await;

    let terminals = h.engine.terminal_nodes(h.workspace_id).await.unwrap();
    assert_eq!(terminals.len(), 1);

    let executed = h.engine.execute_node(chart.id).await.unwrap();
    let results = executed.results.unwrap();
    assert_eq!(results.data_type, DataType::Custom);
    assert_eq!(results.name, "Chart");
    assert_eq!(
        results.value,
        json!({
            "type": "bar",
            "values": [
                { "label": "x", "value": 3 },
                { "label": "y", "value": 1 },
            ],
        })
    );
}

#[tokio::test]
async fn test_edit_entries_keeps_unconnected_columns() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(
            vec![
                ValueSchema::new("val", DataType::String),
                ValueSchema::new("keep", DataType::String),
            ],
            vec![json!({ "val": "old", "keep": "k" })],
        )
        .await;

    let input = h.dataset_input(dataset_id).await;
    let edit = h.node("EditEntries").await;
    let output = h.node("DatasetOutput").await;
    h.form(&output, "name", "test").await;
    h.connect(&input, "dataset", &edit, "dataset").await;
    h.connect(&edit, "dataset", &output, "dataset").await;

    let context_output = h.boundary(&edit, ContextBoundary::Output).await;
    let defs = h.engine.input_defs(context_output.id).await.unwrap();
    assert!(defs["keep"].is_optional);

    let replacement = h.node_in("StringInput", vec![edit.id]).await;
    h.form(&replacement, "value", "\"test\"").await;
    h.connect(&replacement, "value", &context_output, "val").await;

    assert!(h.engine.is_node_in_meta_valid(edit.id).await.unwrap());
    let states = h.engine.revalidate_workspace(h.workspace_id).await.unwrap();
    assert_eq!(states[&edit.id], NodeState::Valid);
    assert_eq!(states[&output.id], NodeState::Valid);

    let executed = h.engine.execute_node(output.id).await.unwrap();
    let entries = h
        .store
        .get_entries(result_dataset(&executed.results.unwrap().value))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        serde_json::to_value(&entries[0].values).unwrap(),
        json!({ "keep": "k", "val": "test" })
    );
}

#[tokio::test]
async fn test_comparison_of_numbers() {
    let h = Harness::new().await;
    let a = h.node("NumberInput").await;
    let b = h.node("NumberInput").await;
    let comparison = h.node("Comparison").await;
    h.form(&a, "value", "3").await;
    h.form(&b, "value", "5").await;
    h.connect(&a, "value", &comparison, "a").await;
    h.connect(&b, "value", &comparison, "b").await;
    assert!(!h.engine.is_node_in_meta_valid(comparison.id).await.unwrap());

    h.form(&comparison, "type", "\"LESS_THEN\"").await;
    assert!(h.engine.is_node_in_meta_valid(comparison.id).await.unwrap());
    let executed = h.engine.execute_node(comparison.id).await.unwrap();
    assert_eq!(executed.outputs["value"], json!(true));

    h.form(&comparison, "type", "\"GREATER_THEN\"").await;
    let executed = h.engine.execute_node(comparison.id).await.unwrap();
    assert_eq!(executed.outputs["value"], json!(false));
}

#[tokio::test]
async fn test_aggregate_entries() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(
            vec![
                ValueSchema::new("label", DataType::String),
                ValueSchema::new("amount", DataType::Number),
            ],
            vec![
                json!({ "label": "a", "amount": 4 }),
                json!({ "label": "b", "amount": 1 }),
                json!({ "label": "c" }),
                json!({ "label": "d", "amount": 2 }),
            ],
        )
        .await;

    let input = h.dataset_input(dataset_id).await;
    let aggregate = h.node("AggregateEntries").await;
    h.connect(&input, "dataset", &aggregate, "dataset").await;
    h.form(&aggregate, "valueName", "amount").await;
    h.form(&aggregate, "type", "Median").await;

    assert!(h.engine.is_node_in_meta_valid(aggregate.id).await.unwrap());
    let metas = h.engine.meta_outputs(aggregate.id).await.unwrap();
    assert!(metas["value"].is_present);

    let executed = h.engine.execute_node(aggregate.id).await.unwrap();
    assert_eq!(executed.outputs["value"], json!(2.0));

    h.form(&aggregate, "type", "Sum").await;
    let executed = h.engine.execute_node(aggregate.id).await.unwrap();
    assert_eq!(executed.outputs["value"], json!(7.0));

    // A text column never yields a number.
    h.form(&aggregate, "valueName", "label").await;
    let metas = h.engine.meta_outputs(aggregate.id).await.unwrap();
    assert!(!metas["value"].is_present);
    h.form(&aggregate, "type", "Average").await;
    let err = h.engine.execute_node(aggregate.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NodeFailed { node_id, .. } if node_id == aggregate.id));
}

#[tokio::test]
async fn test_select_values() {
    let h = Harness::new().await;
    let dataset_id = h
        .dataset(
            vec![
                ValueSchema::new("label", DataType::String),
                ValueSchema::new("amount", DataType::Number),
                ValueSchema::new("note", DataType::String),
            ],
            vec![
                json!({ "label": "a", "amount": 1, "note": "x" }),
                json!({ "label": "b", "amount": 2, "note": "y" }),
            ],
        )
        .await;

    let input = h.dataset_input(dataset_id).await;
    let select = h.node("SelectValues").await;
    h.connect(&input, "dataset", &select, "dataset").await;
    assert!(!h.engine.is_node_in_meta_valid(select.id).await.unwrap());

    h.form(&select, "values", r#"["amount", "label", "missing"]"#)
        .await;
    assert!(h.engine.is_node_in_meta_valid(select.id).await.unwrap());
    let metas = h.engine.meta_outputs(select.id).await.unwrap();
    let names: Vec<_> = metas["dataset"].content["schema"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("label"), json!("amount")]);

    let executed = h.engine.execute_node(select.id).await.unwrap();
    let selected = result_dataset(&executed.outputs["dataset"]);
    let dataset = h.store.get_dataset(selected).await.unwrap();
    assert_eq!(dataset.name, "test (selected)");
    assert_eq!(dataset.schema.len(), 2);

    let entries = h.store.get_entries(selected).await.unwrap();
    assert_eq!(
        serde_json::to_value(&entries[1].values).unwrap(),
        json!({ "amount": 2, "label": "b" })
    );
}

#[tokio::test]
async fn test_sound_chart_folds_entries() {
    let h = Harness::new().await;
    let columns = [
        ("source", DataType::String),
        ("destination", DataType::String),
        ("fromWestToEast", DataType::Boolean),
        ("sortingValue", DataType::Number),
        ("value", DataType::Number),
    ];
    let dataset_id = h
        .dataset(
            columns
                .iter()
                .map(|(name, data_type)| ValueSchema::new(*name, *data_type))
                .collect(),
            vec![
                json!({
                    "source": "a", "destination": "b", "fromWestToEast": true,
                    "sortingValue": 2, "value": 5,
                }),
                json!({
                    "source": "a", "destination": "b", "fromWestToEast": true,
                    "sortingValue": 2, "value": 25,
                }),
                json!({
                    "source": "b", "destination": "c", "fromWestToEast": false,
                    "sortingValue": 3, "value": 15,
                }),
            ],
        )
        .await;

    let input = h.dataset_input(dataset_id).await;
    let chart = h.node("SoundChart").await;
    h.form(&chart, "name", "a").await;
    h.connect(&input, "dataset", &chart, "dataset").await;

    let context_input = h.boundary(&chart, ContextBoundary::Input).await;
    let context_output = h.boundary(&chart, ContextBoundary::Output).await;
    for (name, _) in &columns {
        h.connect(&context_input, name, &context_output, name).await;
    }
    assert!(h.engine.is_node_in_meta_valid(chart.id).await.unwrap());

    let executed = h.engine.execute_node(chart.id).await.unwrap();
    assert!(executed.outputs.is_empty());
    let results = executed.results.unwrap();
    assert_eq!(results.name, "a");
    assert_eq!(results.description, "");
    assert_eq!(results.data_type, DataType::Custom);
    assert_eq!(
        results.value,
        json!({
            "type": "SoundChart",
            "values": {
                "cities": {
                    "east": {
                        "b": {
                            "exportVolume": 15.0,
                            "importVolume": 30.0,
                            "isWest": false,
                            "sortingValue": 3.0,
                        },
                    },
                    "west": {
                        "a": {
                            "exportVolume": 30.0,
                            "importVolume": 0.0,
                            "isWest": true,
                            "sortingValue": 2.0,
                        },
                        "c": {
                            "exportVolume": 0.0,
                            "importVolume": 15.0,
                            "isWest": true,
                            "sortingValue": 3.0,
                        },
                    },
                },
                "passages": [
                    { "destination": "b", "isEastPassage": true, "source": "a", "value": 5.0 },
                    { "destination": "b", "isEastPassage": true, "source": "a", "value": 25.0 },
                    { "destination": "c", "isEastPassage": false, "source": "b", "value": 15.0 },
                ],
            },
        })
    );
}
