//! Filter expressions.
//!
//! The feeder accepts a free-form SQL-like filter string. Values are
//! always quoted; embedded single quotes are doubled.

use std::fmt;

/// A conjunction of equality clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<String>,
}

impl Filter {
    /// Creates a filter with a single `field = 'value'` clause.
    pub fn eq(field: &str, value: &str) -> Self {
        Self::default().and_eq(field, value)
    }

    /// Adds another `field = 'value'` clause.
    pub fn and_eq(mut self, field: &str, value: &str) -> Self {
        self.clauses
            .push(format!("{field} = '{}'", value.replace('\'', "''")));
        self
    }

    /// Adds a raw clause verbatim.
    pub fn and_raw(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    /// Returns true if no clause was added.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" AND "))
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.to_string()
    }
}
