//! Core step trait and the uniform per-row result envelope.
//!
//! This module defines the [`Step`] trait, the per-row execution contract
//! shared by every step type, along with [`StepResult`], the [`Params`]
//! configuration descriptor and [`Labeled`] strategies.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::Outcome;
use crate::row::Row;
use crate::statistics::Statistics;
use crate::Result;

pub mod custom;
pub mod enrichment;

pub use custom::CustomStep;
pub use enrichment::{from_fn, EnrichmentStep, ExternalCall, FnCall};

/// The uniform output a step produces for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Output field(s) keyed by name. Always holds the keys the step is
    /// responsible for, even on failure.
    pub fields: IndexMap<String, Outcome>,
    /// Timing and outcome of the underlying call.
    pub statistics: Statistics,
    /// The effective input sent to the external call, if the step makes one.
    pub input: Option<String>,
}

impl StepResult {
    /// A result with a single field named `name`.
    pub fn single(
        name: impl Into<String>,
        value: Outcome,
        statistics: Statistics,
        input: Option<String>,
    ) -> Self {
        let mut fields = IndexMap::with_capacity(1);
        fields.insert(name.into(), value);
        Self {
            fields,
            statistics,
            input,
        }
    }

    /// Look up one output field.
    pub fn field(&self, name: &str) -> Option<&Outcome> {
        self.fields.get(name)
    }

    /// Whether the underlying call succeeded.
    pub fn is_success(&self) -> bool {
        self.statistics.success
    }
}

/// Serializable description of how a step is configured.
///
/// Maps configuration field names to JSON values; callables appear as their
/// labels. Used for logging and reproducibility, never for execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(IndexMap<String, Value>);

impl Params {
    /// Start a descriptor with the step's name.
    pub fn named(name: &str) -> Self {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::String(name.to_string()));
        Self(map)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Read one entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Entry names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Convert into a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// A strategy closure paired with a stable, human-readable label.
///
/// The label is what [`Params`] records in place of the closure.
#[derive(Clone)]
pub struct Labeled<F> {
    label: String,
    f: F,
}

impl<F> Labeled<F> {
    /// Pair `f` with an explicit label.
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }

    /// Label `f` with its type name.
    pub fn anonymous(f: F) -> Self {
        Self::new(std::any::type_name::<F>(), f)
    }

    /// The label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow the wrapped closure.
    pub fn get(&self) -> &F {
        &self.f
    }
}

impl<F> std::fmt::Debug for Labeled<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Labeled").field(&self.label).finish()
    }
}

/// The per-row execution contract implemented by every step.
///
/// Implementors hold no per-call mutable state, so one instance can serve
/// many rows concurrently.
///
/// # Example
///
/// ```rust
/// use enrichment_steps::{CustomStep, Labeled, Row, Step};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let step = CustomStep::new(
///     "name_length",
///     Labeled::new("name_len", |row: &Row| {
///         Ok::<_, enrichment_steps::Error>(json!(row.get_str("company").unwrap_or_default().len()))
///     }),
/// );
///
/// let result = step.run(&Row::new().with("company", "Acme")).await.unwrap();
/// assert_eq!(result.field("name_length").and_then(|o| o.value()), Some(&json!(4)));
/// assert_eq!(step.get_params().get("transform"), Some(&json!("name_len")));
/// # });
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// The step's name: its output field key and its statistics key.
    fn name(&self) -> &str;

    /// Execute this step against one row.
    ///
    /// Ordinary call failures surface inside the returned [`StepResult`].
    /// `Err` is reserved for configuration errors detected before any
    /// external call, such as a failed input derivation.
    async fn run(&self, row: &Row) -> Result<StepResult>;

    /// Describe this step's configuration. Defaults to just the name.
    fn get_params(&self) -> Params {
        Params::named(self.name())
    }
}

#[async_trait]
impl Step for Box<dyn Step> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn run(&self, row: &Row) -> Result<StepResult> {
        (**self).run(row).await
    }

    fn get_params(&self) -> Params {
        (**self).get_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_keep_insertion_order() {
        let params = Params::named("serp")
            .with("prompt", "company_hq")
            .with("postprocess", Value::Null);
        assert_eq!(
            params.keys().collect::<Vec<_>>(),
            vec!["name", "prompt", "postprocess"]
        );
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"name":"serp","prompt":"company_hq","postprocess":null}"#
        );
        assert_eq!(params.to_json()["prompt"], json!("company_hq"));
    }

    #[test]
    fn test_anonymous_label_is_stable() {
        fn shout(s: &str) -> String {
            s.to_uppercase()
        }
        let a = Labeled::anonymous(shout);
        let b = Labeled::anonymous(shout);
        assert_eq!(a.label(), b.label());
        assert!(a.label().contains("shout"));
        assert_eq!((a.get())("hi"), "HI");
    }
}
