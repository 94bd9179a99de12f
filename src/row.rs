//! Named-field records flowing through a pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::{CallFailure, Outcome};
use crate::step::StepResult;

/// One record of the input table: an ordered mapping from field name to value.
///
/// Failed step outputs are stored as `null` in [`fields`](Row::fields) with the
/// failure kept alongside in a sidecar, so the column is never missing and a
/// failure is never confused with a legitimate `null`.
///
/// # Example
///
/// ```rust
/// use enrichment_steps::Row;
/// use serde_json::json;
///
/// let mut row = Row::new().with("company", "Acme");
/// assert_eq!(row.get_str("company"), Some("Acme"));
///
/// row.insert("employees", json!(120));
/// assert_eq!(row.keys().collect::<Vec<_>>(), vec!["company", "employees"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    fields: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    errors: IndexMap<String, CallFailure>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, clearing any failure previously recorded for it.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.errors.shift_remove(&name);
        self.fields.insert(name, value.into());
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read a field as a string slice, if it is a JSON string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// The failure recorded for a field, if its producing step failed.
    pub fn error(&self, name: &str) -> Option<&CallFailure> {
        self.errors.get(name)
    }

    /// Reconstruct the tagged outcome of a field.
    pub fn outcome(&self, name: &str) -> Option<Outcome> {
        if let Some(failure) = self.errors.get(name) {
            return Some(Outcome::Failed(failure.clone()));
        }
        self.fields.get(name).cloned().map(Outcome::Value)
    }

    /// Returns `true` if the field exists (even when it holds a failure).
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if any field holds a failure.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Merge the fields of a step result into this row.
    pub fn merge(&mut self, result: &StepResult) {
        for (name, outcome) in &result.fields {
            self.set_outcome(name.clone(), outcome.clone());
        }
    }

    fn set_outcome(&mut self, name: String, outcome: Outcome) {
        match outcome {
            Outcome::Value(value) => {
                self.errors.shift_remove(&name);
                self.fields.insert(name, value);
            }
            Outcome::Failed(failure) => {
                self.fields.insert(name.clone(), Value::Null);
                self.errors.insert(name, failure);
            }
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::Statistics;
    use serde_json::json;
    use std::time::Duration;

    fn result_with(name: &str, outcome: Outcome) -> StepResult {
        let mut fields = IndexMap::new();
        fields.insert(name.to_string(), outcome);
        StepResult {
            fields,
            statistics: Statistics::succeeded(0, Duration::ZERO),
            input: None,
        }
    }

    #[test]
    fn test_merge_failure_keeps_column() {
        let mut row = Row::new().with("company", "Acme");
        row.merge(&result_with(
            "serp",
            Outcome::Failed(CallFailure::new("timeout", "timed out")),
        ));

        assert!(row.contains("serp"));
        assert_eq!(row.get("serp"), Some(&Value::Null));
        assert_eq!(row.error("serp").map(|e| e.kind.as_str()), Some("timeout"));
        assert!(row.outcome("serp").unwrap().is_failed());
        assert!(row.has_errors());
    }

    #[test]
    fn test_legitimate_null_is_not_an_error() {
        let mut row = Row::new();
        row.merge(&result_with("serp", Outcome::Value(Value::Null)));
        assert_eq!(row.outcome("serp"), Some(Outcome::Value(Value::Null)));
        assert!(!row.has_errors());
    }

    #[test]
    fn test_success_overwrites_previous_failure() {
        let mut row = Row::new();
        row.merge(&result_with("serp", Outcome::Failed(CallFailure::new("http", "500"))));
        row.merge(&result_with("serp", Outcome::Value(json!("ok"))));
        assert_eq!(row.get_str("serp"), Some("ok"));
        assert!(row.error("serp").is_none());
    }

    #[test]
    fn test_from_iter_preserves_order() {
        let row: Row = vec![("b", json!(2)), ("a", json!(1))].into_iter().collect();
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.len(), 2);
    }
}
