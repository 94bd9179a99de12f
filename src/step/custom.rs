//! Steps that apply a local function to a row.

use async_trait::async_trait;
use serde_json::Value;

use super::{Labeled, Params, Step, StepResult};
use crate::instrumented::with_statistics;
use crate::row::Row;
use crate::Result;

/// A step that computes one field from the row with a local, synchronous
/// function, instrumented like any external call.
///
/// Errors from the transform become [`Outcome::Failed`](crate::Outcome::Failed)
/// for that row. The result carries no `input`, since nothing is sent out.
pub struct CustomStep<F> {
    name: String,
    transform: Labeled<F>,
}

impl<F> CustomStep<F>
where
    F: Fn(&Row) -> Result<Value> + Send + Sync,
{
    /// Create a new custom step producing the field `name`.
    pub fn new(name: impl Into<String>, transform: Labeled<F>) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

#[async_trait]
impl<F> Step for CustomStep<F>
where
    F: Fn(&Row) -> Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, row: &Row) -> Result<StepResult> {
        let transform = self.transform.get();
        let instrumented =
            with_statistics(move |r: &Row| std::future::ready(transform(r))).with_label(&self.name);
        let (value, statistics) = instrumented.call(row).await;
        Ok(StepResult::single(self.name.clone(), value, statistics, None))
    }

    fn get_params(&self) -> Params {
        Params::named(&self.name).with("transform", self.transform.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[tokio::test]
    async fn test_transform_error_is_row_local() {
        let step = CustomStep::new(
            "domain",
            Labeled::new("domain_of", |row: &Row| {
                row.get_str("website")
                    .map(|w| json!(w.trim_start_matches("https://")))
                    .ok_or_else(|| Error::Execution("no website".into()))
            }),
        );

        let ok = step
            .run(&Row::new().with("website", "https://acme.test"))
            .await
            .unwrap();
        assert_eq!(ok.field("domain").and_then(|o| o.value()), Some(&json!("acme.test")));
        assert!(ok.is_success());
        assert_eq!(ok.input, None);

        let failed = step.run(&Row::new()).await.unwrap();
        assert_eq!(failed.fields.len(), 1);
        assert!(failed.field("domain").unwrap().is_failed());
        assert!(!failed.statistics.success);
        assert_eq!(
            failed.statistics.error.as_ref().map(|e| e.message.as_str()),
            Some("Execution error: no website")
        );
    }

    #[test]
    fn test_params_use_label() {
        let step = CustomStep::new("n", Labeled::new("count_fields", |row: &Row| Ok::<_, Error>(json!(row.len()))));
        assert_eq!(
            step.get_params().to_json(),
            json!({"name": "n", "transform": "count_fields"})
        );
    }
}
