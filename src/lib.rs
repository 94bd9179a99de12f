//! # enrichment-steps
//!
//! Instrumented, statistics-bearing steps for row-oriented data enrichment
//! pipelines.
//!
//! Every step turns a single-row transformation into a uniform
//! [`StepResult`]: the produced field, the statistics of the underlying call
//! (latency, success or failure) and the effective input that was sent out.
//! Failed calls never abort a row. They surface as an explicit
//! [`Outcome::Failed`] marker next to failure metadata.
//!
//! ## Core Concepts
//!
//! - **Step**: The per-row execution contract (`run`, `get_params`)
//! - **with_statistics**: Wraps any async function with timing and outcome capture
//! - **StepResult**: Fields, statistics and effective input for one row
//! - **EnrichmentStep**: Derive an input from a row, call an external service, post-process
//! - **SerpClient**: Search endpoint client used by the SERP enrichment step
//! - **CustomStep**: Instrumented local transformation of a row
//! - **Pipeline**: Runs steps over rows and aggregates per-step metrics
//!
//! ## Example: Enrich Rows with Metrics
//!
//! ```rust
//! use enrichment_steps::{from_fn, EnrichmentStep, Error, Labeled, Pipeline, Row, Step};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let step = EnrichmentStep::new(
//!     "serp",
//!     Labeled::new("company_hq", |row: &Row| {
//!         Ok::<_, Error>(format!("{} headquarters", row.get_str("company").unwrap_or_default()))
//!     }),
//!     from_fn("fake_search", |q: String| async move {
//!         if q.starts_with("Acme") {
//!             Ok(json!("Acme HQ is in Springfield"))
//!         } else {
//!             Err(Error::Timeout("request timed out".to_string()))
//!         }
//!     }),
//! );
//!
//! let result = step.run(&Row::new().with("company", "Acme")).await.unwrap();
//! assert_eq!(result.input.as_deref(), Some("Acme headquarters"));
//! assert!(result.statistics.success);
//!
//! let pipeline = Pipeline::new("companies").with_step(step).unwrap();
//! let rows = vec![
//!     Row::new().with("company", "Acme"),
//!     Row::new().with("company", "Globex"),
//! ];
//! let (rows, metrics) = pipeline.run(rows).await.unwrap();
//!
//! assert_eq!(rows[0].get_str("serp"), Some("Acme HQ is in Springfield"));
//! assert_eq!(rows[1].error("serp").map(|e| e.kind.as_str()), Some("timeout"));
//! assert_eq!(metrics.step("serp").unwrap().num_failure, 1);
//! # });
//! ```

pub mod error;
pub mod outcome;
pub mod statistics;
pub mod instrumented;
pub mod row;
pub mod step;
pub mod serp;
pub mod metrics;
pub mod events;
pub mod context;
pub mod pipeline;

pub use error::{Error, Result};
pub use outcome::{CallFailure, Outcome};
pub use statistics::Statistics;
pub use instrumented::{with_statistics, Instrumented};
pub use row::Row;
pub use metrics::{PipelineMetrics, StepMetrics};
pub use events::{PipelineEvent, TraceEntry};
pub use context::ExecutionContext;
pub use pipeline::Pipeline;

// Re-export step types
pub use step::{Labeled, Params, Step, StepResult};
pub use step::custom::CustomStep;
pub use step::enrichment::{from_fn, EnrichmentStep, ExternalCall, FnCall, Postprocess};
pub use serp::{serp_step, SerpClient, SerpConfig, SerpEnrichmentStep};
