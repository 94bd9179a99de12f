//! Row-by-row pipeline executor with automatic metrics collection.

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::context::ExecutionContext;
use crate::events::PipelineEvent;
use crate::metrics::PipelineMetrics;
use crate::row::Row;
use crate::step::{Params, Step};
use crate::{Error, Result};

/// Runs an ordered list of steps over a table of rows.
///
/// Each step sees the row with the fields of earlier steps merged in. A
/// failed call only marks that row's field as failed; a derivation error
/// aborts the run.
///
/// # Example
///
/// ```rust
/// use enrichment_steps::{from_fn, EnrichmentStep, Labeled, Pipeline, Row};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let lookup = EnrichmentStep::new(
///     "serp",
///     Labeled::new("company_hq", |row: &Row| {
///         Ok::<_, enrichment_steps::Error>(format!("{} headquarters", row.get_str("company").unwrap_or_default()))
///     }),
///     from_fn("fake_search", |q: String| async move {
///         Ok::<_, enrichment_steps::Error>(json!(q.len()))
///     }),
/// );
///
/// let pipeline = Pipeline::new("companies").with_step(lookup).unwrap();
/// let rows = vec![Row::new().with("company", "Acme")];
/// let (rows, metrics) = pipeline.run(rows).await.unwrap();
///
/// assert_eq!(rows[0].get("serp"), Some(&json!(17)));
/// assert_eq!(metrics.step("serp").unwrap().num_success, 1);
/// # });
/// ```
pub struct Pipeline {
    name: String,
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step. Step names must be unique within a pipeline.
    pub fn with_step<S: Step + 'static>(mut self, step: S) -> Result<Self> {
        if self.steps.iter().any(|s| s.name() == step.name()) {
            return Err(Error::Config(format!(
                "duplicate step name '{}' in pipeline '{}'",
                step.name(),
                self.name
            )));
        }
        self.steps.push(Box::new(step));
        Ok(self)
    }

    /// Returns the name of this pipeline.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured steps, in execution order.
    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    /// Parameter descriptors of every step, in execution order.
    pub fn params(&self) -> Vec<Params> {
        self.steps.iter().map(|s| s.get_params()).collect()
    }

    /// Run every step against one row, merging each result into it.
    pub async fn run_row(&self, ctx: &ExecutionContext, index: usize, mut row: Row) -> Result<Row> {
        for step in &self.steps {
            ctx.emit(PipelineEvent::StepStart {
                step_name: step.name().to_string(),
                row: index,
            });

            let result = match step.run(&row).await {
                Ok(result) => result,
                Err(e) => {
                    ctx.emit(PipelineEvent::Error {
                        step_name: step.name().to_string(),
                        row: index,
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            };

            ctx.record_result(step.name(), index, &result);
            row.merge(&result);
        }
        ctx.record_row();
        Ok(row)
    }

    /// Run the pipeline over `rows` one at a time, returning the enriched
    /// rows along with the collected metrics.
    ///
    /// A fresh [`ExecutionContext`] is created for each invocation.
    pub async fn run(&self, rows: Vec<Row>) -> Result<(Vec<Row>, PipelineMetrics)> {
        let ctx = ExecutionContext::new();
        let rows = self.run_with_ctx(&ctx, rows).await?;
        Ok((rows, ctx.snapshot()))
    }

    /// Run the pipeline sequentially with a caller-provided execution context.
    ///
    /// Useful when you want to share a context across multiple runs to
    /// accumulate metrics.
    pub async fn run_with_ctx(&self, ctx: &ExecutionContext, rows: Vec<Row>) -> Result<Vec<Row>> {
        tracing::info!(pipeline = %self.name, rows = rows.len(), "pipeline started");
        let mut output = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            output.push(self.run_row(ctx, index, row).await?);
        }
        tracing::info!(pipeline = %self.name, rows = output.len(), "pipeline finished");
        Ok(output)
    }

    /// Run the pipeline with up to `concurrency` rows in flight at once.
    ///
    /// Output rows keep their input order.
    pub async fn run_concurrent(
        &self,
        rows: Vec<Row>,
        concurrency: usize,
    ) -> Result<(Vec<Row>, PipelineMetrics)> {
        if concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }

        let ctx = ExecutionContext::new();
        tracing::info!(
            pipeline = %self.name,
            rows = rows.len(),
            concurrency,
            "pipeline started"
        );

        let ctx_ref = &ctx;
        let output: Vec<Row> = stream::iter(rows.into_iter().enumerate())
            .map(|(index, row)| self.run_row(ctx_ref, index, row))
            .buffered(concurrency)
            .try_collect()
            .await?;

        tracing::info!(pipeline = %self.name, rows = output.len(), "pipeline finished");
        Ok((output, ctx.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{from_fn, CustomStep, EnrichmentStep, Labeled};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn company_query(row: &Row) -> Result<String> {
        row.get_str("company")
            .map(|c| format!("{c} headquarters"))
            .ok_or_else(|| Error::Message("row has no 'company' field".into()))
    }

    fn search_step() -> impl Step {
        EnrichmentStep::new(
            "serp",
            Labeled::new("company_query", company_query),
            from_fn("fake_search", |q: String| async move {
                if q.starts_with("Broken") {
                    Err(Error::Timeout("request timed out".into()))
                } else {
                    Ok(json!(format!("{q}: Springfield")))
                }
            }),
        )
    }

    fn companies(names: &[&str]) -> Vec<Row> {
        names.iter().map(|n| Row::new().with("company", *n)).collect()
    }

    #[tokio::test]
    async fn test_later_steps_see_earlier_fields() {
        let pipeline = Pipeline::new("enrich")
            .with_step(search_step())
            .unwrap()
            .with_step(CustomStep::new(
                "serp_len",
                Labeled::new("serp_len", |row: &Row| -> Result<Value> {
                    Ok(json!(row.get_str("serp").map(str::len)))
                }),
            ))
            .unwrap();

        let (rows, metrics) = pipeline.run(companies(&["Acme"])).await.unwrap();
        assert_eq!(rows[0].get_str("serp"), Some("Acme headquarters: Springfield"));
        assert_eq!(rows[0].get("serp_len"), Some(&json!(30)));
        assert_eq!(metrics.rows_processed, 1);
        assert_eq!(metrics.steps.keys().collect::<Vec<_>>(), vec!["serp", "serp_len"]);
    }

    #[tokio::test]
    async fn test_failed_call_does_not_abort_other_rows() {
        init_tracing();
        let pipeline = Pipeline::new("enrich").with_step(search_step()).unwrap();

        let (rows, metrics) = pipeline
            .run(companies(&["Acme", "Broken Corp", "Globex"]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].error("serp").is_none());
        assert!(rows[1].contains("serp"));
        assert_eq!(rows[1].error("serp").map(|e| e.kind.as_str()), Some("timeout"));
        assert_eq!(rows[2].get_str("serp"), Some("Globex headquarters: Springfield"));

        let serp = metrics.step("serp").unwrap();
        assert_eq!(serp.num_success, 2);
        assert_eq!(serp.num_failure, 1);
        assert_eq!(metrics.rows_processed, 3);
    }

    #[tokio::test]
    async fn test_derivation_error_aborts_run() {
        let pipeline = Pipeline::new("enrich").with_step(search_step()).unwrap();
        let rows = vec![Row::new().with("company", "Acme"), Row::new().with("name", "x")];

        let ctx = ExecutionContext::new();
        let err = pipeline.run_with_ctx(&ctx, rows).await.unwrap_err();
        assert!(matches!(err, Error::Derivation { .. }));

        let last = ctx.trace_snapshot().pop().unwrap();
        assert!(matches!(last.event, PipelineEvent::Error { row: 1, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_run_preserves_order() {
        init_tracing();
        let slow_first = EnrichmentStep::new(
            "serp",
            Labeled::new("company_query", company_query),
            from_fn("fake_search", |q: String| async move {
                if q.starts_with("Acme") {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Ok::<_, Error>(json!(q))
            }),
        );
        let pipeline = Pipeline::new("enrich").with_step(slow_first).unwrap();

        let (rows, metrics) = pipeline
            .run_concurrent(companies(&["Acme", "Globex", "Initech"]), 3)
            .await
            .unwrap();

        let values: Vec<_> = rows.iter().map(|r| r.get_str("serp").unwrap()).collect();
        assert_eq!(
            values,
            vec!["Acme headquarters", "Globex headquarters", "Initech headquarters"]
        );
        assert_eq!(metrics.step("serp").unwrap().num_success, 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let pipeline = Pipeline::new("enrich").with_step(search_step()).unwrap();
        let err = pipeline.run_concurrent(Vec::new(), 0).await.unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_duplicate_step_names_rejected() {
        let err = Pipeline::new("enrich")
            .with_step(search_step())
            .unwrap()
            .with_step(search_step())
            .err()
            .unwrap();
        assert!(err.to_string().contains("duplicate step name 'serp'"));
    }

    #[test]
    fn test_params_lists_every_step() {
        let pipeline = Pipeline::new("enrich").with_step(search_step()).unwrap();
        let params = pipeline.params();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].get("prompt"), Some(&json!("company_query")));
        assert_eq!(params[0].get("external_call"), Some(&json!("fake_search")));
    }
}
