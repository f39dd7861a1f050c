//! Data type checks of resolved input values.

use std::str::FromStr;

use calcflow_core::types::{DataType, DatasetRef, IoValues, SocketDefs};
use serde_json::Value;

/// Tracing target for validation.
const TRACING_TARGET: &str = "calcflow_runtime::validation";

/// Returns whether `value` is an acceptable runtime value for `data_type`.
///
/// Missing and `null` values are never valid.
pub fn is_input_valid(value: Option<&Value>, data_type: DataType) -> bool {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return false;
    };

    match data_type {
        DataType::Number => value.as_f64().is_some_and(f64::is_finite),
        DataType::String => value.is_string(),
        DataType::Boolean => value.is_boolean(),
        DataType::Datetime => value
            .as_str()
            .is_some_and(|s| jiff::Timestamp::from_str(s).is_ok()),
        DataType::Time => value
            .as_str()
            .is_some_and(|s| jiff::civil::Time::from_str(s).is_ok()),
        DataType::Dataset => DatasetRef::from_value(value).is_some(),
        DataType::Custom => {
            tracing::warn!(
                target: TRACING_TARGET,
                data_type = %data_type,
                "Unsupported data type"
            );
            true
        }
    }
}

/// Returns whether every declared input holds a valid value.
///
/// An optional input may be missing, but a value it does carry must still
/// match its data type.
pub fn are_inputs_valid(inputs: &IoValues, defs: &SocketDefs) -> bool {
    defs.iter().all(|(name, def)| match inputs.get(name) {
        None if def.is_optional => true,
        value => is_input_valid(value, def.data_type),
    })
}

#[cfg(test)]
mod tests {
    use calcflow_core::DatasetId;
    use calcflow_core::types::SocketDef;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_missing_values_are_invalid() {
        assert!(!is_input_valid(None, DataType::String));
        assert!(!is_input_valid(Some(&Value::Null), DataType::Number));
    }

    #[test]
    fn test_numbers() {
        for value in [json!(9.4523), json!(0), json!(-0.3), json!(11)] {
            assert!(is_input_valid(Some(&value), DataType::Number));
        }
        for value in [json!({}), json!("9")] {
            assert!(!is_input_valid(Some(&value), DataType::Number));
        }
    }

    #[test]
    fn test_strings_and_booleans() {
        assert!(is_input_valid(Some(&json!("true")), DataType::String));
        assert!(is_input_valid(Some(&json!("")), DataType::String));
        assert!(!is_input_valid(Some(&json!(1)), DataType::String));
        assert!(is_input_valid(Some(&json!(false)), DataType::Boolean));
        assert!(!is_input_valid(Some(&json!("false")), DataType::Boolean));
    }

    #[test]
    fn test_dates_and_times() {
        let datetime = json!("2024-03-01T12:30:00Z");
        assert!(is_input_valid(Some(&datetime), DataType::Datetime));
        assert!(!is_input_valid(Some(&json!("yesterday")), DataType::Datetime));
        assert!(is_input_valid(Some(&json!("12:30:00")), DataType::Time));
        assert!(!is_input_valid(Some(&json!(1230)), DataType::Time));
    }

    #[test]
    fn test_datasets() {
        let value = DatasetRef::new(DatasetId::new()).to_value();
        assert!(is_input_valid(Some(&value), DataType::Dataset));
        assert!(!is_input_valid(Some(&json!({ "entries": [] })), DataType::Dataset));
        assert!(is_input_valid(Some(&json!([1, 2])), DataType::Custom));
    }

    #[test]
    fn test_are_inputs_valid() {
        let defs = SocketDefs::from([
            ("a".to_owned(), SocketDef::new(DataType::Number, "A")),
            ("b".to_owned(), SocketDef::new(DataType::Number, "B")),
        ]);
        let mut inputs = IoValues::from([("a".to_owned(), json!(1))]);
        assert!(!are_inputs_valid(&inputs, &defs));

        inputs.insert("b".to_owned(), json!(2));
        assert!(are_inputs_valid(&inputs, &defs));
        assert!(are_inputs_valid(&IoValues::new(), &SocketDefs::new()));
    }

    #[test]
    fn test_optional_inputs_may_be_missing() {
        let defs = SocketDefs::from([
            ("a".to_owned(), SocketDef::new(DataType::Number, "A")),
            ("b".to_owned(), SocketDef::new(DataType::Number, "B").optional()),
        ]);
        let mut inputs = IoValues::from([("a".to_owned(), json!(1))]);
        assert!(are_inputs_valid(&inputs, &defs));

        inputs.insert("b".to_owned(), json!("two"));
        assert!(!are_inputs_valid(&inputs, &defs));
    }
}
