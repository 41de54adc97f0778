//! Records and field values.

use crate::types::{LocalId, NaturalKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// A single stored field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Absent value.
    Null,
    /// Text.
    Text(String),
    /// Integer.
    Int(i64),
    /// Decimal.
    Decimal(f64),
    /// Boolean.
    Bool(bool),
    /// Reference to another local record.
    Ref(LocalId),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Decimal(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<LocalId> for FieldValue {
    fn from(id: LocalId) -> Self {
        FieldValue::Ref(id)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A set of named field values.
///
/// Fields are kept sorted by name so that records compare and print
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, builder style.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Returns a field; absent fields read as `None`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns an integer field.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns a decimal field.
    pub fn decimal(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Decimal(v)) => Some(*v),
            Some(FieldValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns a reference field.
    pub fn reference(&self, name: &str) -> Option<LocalId> {
        match self.fields.get(name) {
            Some(FieldValue::Ref(id)) => Some(*id),
            _ => None,
        }
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the fields of `self` whose value differs from `stored`.
    ///
    /// Only fields present in `self` are compared; a field missing from
    /// `stored` compares as [`FieldValue::Null`].
    pub fn diff(&self, stored: &Record) -> Record {
        let fields = self
            .fields
            .iter()
            .filter(|(name, value)| {
                let current = stored.fields.get(name.as_str()).unwrap_or(&FieldValue::Null);
                current != *value
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Record { fields }
    }

    /// Overwrites fields of `self` with every field of `patch`.
    pub fn apply(&mut self, patch: &Record) {
        for (name, value) in &patch.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

/// A record as persisted, with both identities.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Local surrogate identity.
    pub id: LocalId,
    /// Natural key.
    pub key: NaturalKey,
    /// Field values.
    pub record: Record,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let record = Record::new()
            .with("name", "Algorithms")
            .with("credits", 3i64)
            .with("program", LocalId::new(2))
            .with("score", 81.5)
            .with("lecturer", None::<LocalId>);
        assert_eq!(record.text("name"), Some("Algorithms"));
        assert_eq!(record.int("credits"), Some(3));
        assert_eq!(record.reference("program"), Some(LocalId::new(2)));
        assert_eq!(record.decimal("score"), Some(81.5));
        assert_eq!(record.decimal("credits"), Some(3.0));
        assert!(record.get("lecturer").unwrap().is_null());
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn diff_reports_changed_fields_only() {
        let stored = Record::new().with("name", "Old").with("credits", 3i64).with("local_note", "x");
        let incoming = Record::new().with("name", "New").with("credits", 3i64);

        let diff = incoming.diff(&stored);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.text("name"), Some("New"));
        assert!(incoming.diff(&incoming).is_empty());
    }

    #[test]
    fn diff_treats_missing_as_null() {
        let stored = Record::new();
        let incoming = Record::new().with("lecturer", None::<LocalId>);
        assert!(incoming.diff(&stored).is_empty());

        let incoming = Record::new().with("lecturer", LocalId::new(1));
        assert_eq!(incoming.diff(&stored).len(), 1);
    }

    #[test]
    fn apply_patch() {
        let mut stored = Record::new().with("a", 1i64).with("b", 2i64);
        stored.apply(&Record::new().with("b", 3i64).with("c", 4i64));
        assert_eq!(stored.int("a"), Some(1));
        assert_eq!(stored.int("b"), Some(3));
        assert_eq!(stored.int("c"), Some(4));
    }
}
