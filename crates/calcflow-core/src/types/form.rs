//! Parsing of raw node form values.

use serde_json::Value;

use super::node::FormValues;
use super::socket::IoValues;

/// Parsed form of a node.
pub type Form = IoValues<Value>;

/// Parses every raw form value as JSON.
///
/// Values that are not valid JSON are kept as plain strings, so a bare
/// `test` becomes `"test"` while `{NaN` becomes the string `"{NaN"` and is
/// rejected later by whichever node expects a number.
pub fn parse_form(form: &FormValues) -> Form {
    form.iter()
        .map(|(name, raw)| {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            (name.clone(), value)
        })
        .collect()
}

/// Typed accessors on a parsed form.
pub trait FormExt {
    /// Returns the value as a string slice.
    fn str_value(&self, name: &str) -> Option<&str>;

    /// Returns the value as a finite number.
    fn number_value(&self, name: &str) -> Option<f64>;

    /// Returns the value as a boolean.
    fn bool_value(&self, name: &str) -> Option<bool>;
}

impl FormExt for Form {
    fn str_value(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    fn number_value(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64().filter(|n| n.is_finite())
    }

    fn bool_value(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }
}
