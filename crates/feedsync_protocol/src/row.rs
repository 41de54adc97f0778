//! Loosely-typed payload rows.
//!
//! Feeder payloads are JSON objects whose fields may be missing, null,
//! empty strings, numbers encoded as strings, or the other way round.
//! [`Row`] normalizes those shapes at extraction time:
//!
//! - [`Row::text`]: trimmed, non-empty string; numbers are rendered as text
//! - [`Row::int`] / [`Row::decimal`]: numbers or numeric strings; blank is `None`
//! - [`Row::flag`]: `1`, `"1"`, `true`, `"true"`, `"y"` are true; blank is `None`
//!
//! A present but unparsable value is an error, not a silent default.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::{Map, Value};

/// One row of a feeder payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Sets a field, builder style.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Returns the raw value of a field.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Converts back into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Returns a trimmed, non-empty text field.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Returns the first non-empty text among `keys`.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }

    /// Returns a text field or a missing-field error.
    pub fn require_text(&self, key: &str) -> ProtocolResult<String> {
        self.text(key)
            .ok_or_else(|| ProtocolError::MissingField(key.to_string()))
    }

    /// Returns an integer field.
    pub fn int(&self, key: &str) -> ProtocolResult<Option<i64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| ProtocolError::invalid_field(key, format!("{n} is not an integer"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| {
                        trimmed
                            .parse::<f64>()
                            .ok()
                            .filter(|f| f.fract() == 0.0)
                            .map(|f| f as i64)
                    })
                    .map(Some)
                    .ok_or_else(|| {
                        ProtocolError::invalid_field(key, format!("{s:?} is not an integer"))
                    })
            }
            Some(other) => Err(ProtocolError::invalid_field(
                key,
                format!("{other} is not an integer"),
            )),
        }
    }

    /// Returns a decimal field.
    pub fn decimal(&self, key: &str) -> ProtocolResult<Option<f64>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ProtocolError::invalid_field(key, format!("{s:?} is not a number"))),
            Some(other) => Err(ProtocolError::invalid_field(
                key,
                format!("{other} is not a number"),
            )),
        }
    }

    /// Returns a boolean-ish field.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" => None,
                "1" | "true" | "y" | "yes" => Some(true),
                _ => Some(false),
            },
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn text_normalization() {
        let row = Row::new()
            .with("a", "  x ")
            .with("b", "   ")
            .with("c", 42)
            .with("d", Value::Null);
        assert_eq!(row.text("a").as_deref(), Some("x"));
        assert_eq!(row.text("b"), None);
        assert_eq!(row.text("c").as_deref(), Some("42"));
        assert_eq!(row.text("d"), None);
        assert_eq!(row.text("missing"), None);
        assert_eq!(row.first_text(&["b", "a"]).as_deref(), Some("x"));
    }

    #[test]
    fn require_text_reports_field() {
        let row = Row::new();
        let err = row.require_text("nim").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField(f) if f == "nim"));
    }

    #[test]
    fn integer_shapes() {
        let row = Row::new()
            .with("n", 3)
            .with("s", "4")
            .with("f", "2.0")
            .with("blank", "")
            .with("bad", "abc");
        assert_eq!(row.int("n").unwrap(), Some(3));
        assert_eq!(row.int("s").unwrap(), Some(4));
        assert_eq!(row.int("f").unwrap(), Some(2));
        assert_eq!(row.int("blank").unwrap(), None);
        assert_eq!(row.int("missing").unwrap(), None);
        assert!(row.int("bad").is_err());
    }

    #[test]
    fn decimal_shapes() {
        let row = Row::new()
            .with("n", json!(3.5))
            .with("comma", "3,75")
            .with("bad", json!([1]));
        assert_eq!(row.decimal("n").unwrap(), Some(3.5));
        assert_eq!(row.decimal("comma").unwrap(), Some(3.75));
        assert!(row.decimal("bad").is_err());
    }

    #[test]
    fn flag_shapes() {
        let row = Row::new()
            .with("a", 1)
            .with("b", "0")
            .with("c", true)
            .with("d", "");
        assert_eq!(row.flag("a"), Some(true));
        assert_eq!(row.flag("b"), Some(false));
        assert_eq!(row.flag("c"), Some(true));
        assert_eq!(row.flag("d"), None);
    }

    proptest! {
        #[test]
        fn numeric_strings_parse_like_numbers(n in -1_000_000i64..1_000_000) {
            let row = Row::new().with("s", n.to_string()).with("n", n);
            prop_assert_eq!(row.int("s").unwrap(), Some(n));
            prop_assert_eq!(row.int("n").unwrap(), Some(n));
            prop_assert_eq!(row.text("n"), Some(n.to_string()));
        }
    }
}
