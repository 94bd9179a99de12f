//! Enrichment steps that derive an input from a row and call an external service.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

use super::{Labeled, Params, Step, StepResult};
use crate::instrumented::with_statistics;
use crate::row::Row;
use crate::{Error, Result};

/// Boxed post-processing strategy applied to the raw external response.
pub type Postprocess = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// The external service an [`EnrichmentStep`] calls once per row.
///
/// Implementations must be safe to call concurrently. Credentials belong in
/// the implementing type, supplied at construction.
#[async_trait]
pub trait ExternalCall: Send + Sync {
    /// Perform the call for one derived input.
    async fn call(&self, input: String) -> Result<Value>;

    /// Identifying label recorded in step parameters.
    fn label(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An [`ExternalCall`] backed by an async closure.
///
/// Constructed via [`from_fn`].
pub struct FnCall<F> {
    label: String,
    f: F,
}

/// Adapt an async closure into a labelled [`ExternalCall`].
///
/// # Example
///
/// ```rust
/// use enrichment_steps::{from_fn, ExternalCall};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let echo = from_fn("echo", |q: String| async move {
///     Ok::<_, enrichment_steps::Error>(json!(q))
/// });
/// assert_eq!(echo.call("hello".into()).await.unwrap(), json!("hello"));
/// assert_eq!(echo.label(), "echo");
/// # });
/// ```
pub fn from_fn<F, Fut>(label: impl Into<String>, f: F) -> FnCall<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    FnCall {
        label: label.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> ExternalCall for FnCall<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn call(&self, input: String) -> Result<Value> {
        (self.f)(input).await
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// A step that enriches a row with the response of an external call.
///
/// Execution for one row:
/// 1. `derive_input(row)` builds the call input. This runs outside the
///    instrumentation, and its errors propagate from [`Step::run`] as
///    [`Error::Derivation`].
/// 2. The external call and the optional postprocess run inside
///    [`with_statistics`], so their latency and failures land in the result's
///    statistics instead of aborting the row.
/// 3. The outcome is stored under the step's name, with the derived input
///    kept for auditing.
///
/// # Example
///
/// ```rust
/// use enrichment_steps::{from_fn, EnrichmentStep, Labeled, Row, Step};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let search = from_fn("fake_search", |q: String| async move {
///     Ok::<_, enrichment_steps::Error>(json!(format!("results for {q}")))
/// });
/// let step = EnrichmentStep::new(
///     "serp",
///     Labeled::new("company_hq", |row: &Row| {
///         Ok::<_, enrichment_steps::Error>(format!("{} headquarters", row.get_str("company").unwrap_or_default()))
///     }),
///     search,
/// );
///
/// let result = step.run(&Row::new().with("company", "Acme")).await.unwrap();
/// assert_eq!(result.input.as_deref(), Some("Acme headquarters"));
/// assert!(result.statistics.success);
/// # });
/// ```
pub struct EnrichmentStep<C, D> {
    name: String,
    derive_input: Labeled<D>,
    postprocess: Option<Labeled<Postprocess>>,
    external: C,
}

impl<C, D> EnrichmentStep<C, D>
where
    C: ExternalCall,
    D: Fn(&Row) -> Result<String> + Send + Sync,
{
    /// Create a new enrichment step without post-processing.
    pub fn new(name: impl Into<String>, derive_input: Labeled<D>, external: C) -> Self {
        Self {
            name: name.into(),
            derive_input,
            postprocess: None,
            external,
        }
    }

    /// Transform the raw response before it is stored.
    ///
    /// Errors returned by `postprocess` count as call failures.
    pub fn with_postprocess<P>(mut self, postprocess: Labeled<P>) -> Self
    where
        P: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        let label = postprocess.label().to_string();
        let Labeled { f, .. } = postprocess;
        self.postprocess = Some(Labeled::new(label, Box::new(f) as Postprocess));
        self
    }

    /// Access the external call.
    pub fn external(&self) -> &C {
        &self.external
    }

    fn derive(&self, row: &Row) -> Result<String> {
        (self.derive_input.get())(row).map_err(|e| match e {
            Error::Derivation { .. } => e,
            other => Error::Derivation {
                step_name: self.name.clone(),
                message: other.to_string(),
            },
        })
    }
}

#[async_trait]
impl<C, D> Step for EnrichmentStep<C, D>
where
    C: ExternalCall,
    D: Fn(&Row) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, row: &Row) -> Result<StepResult> {
        let input = self.derive(row)?;

        let external = &self.external;
        let postprocess = self.postprocess.as_ref().map(Labeled::get);
        let instrumented = with_statistics(move |q: String| async move {
            let raw = external.call(q).await?;
            match postprocess {
                Some(p) => p(raw),
                None => Ok(raw),
            }
        })
        .with_label(&self.name);

        let (value, statistics) = instrumented.call(input.clone()).await;
        Ok(StepResult::single(
            self.name.clone(),
            value,
            statistics,
            Some(input),
        ))
    }

    fn get_params(&self) -> Params {
        Params::named(&self.name)
            .with("prompt", self.derive_input.label())
            .with(
                "postprocess",
                self.postprocess
                    .as_ref()
                    .map_or(Value::Null, |p| Value::String(p.label().to_string())),
            )
            .with("external_call", self.external.label())
    }
}
