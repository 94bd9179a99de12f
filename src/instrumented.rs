//! Instrumentation wrapper for automatic timing and outcome capture.

use std::future::Future;
use std::time::Instant;

use crate::outcome::{CallFailure, Outcome};
use crate::statistics::{epoch_millis, Statistics};
use crate::Result;

/// Wraps a single-argument async function so that each invocation is timed
/// and its outcome captured.
///
/// For each [`call`](Instrumented::call), the wrapped function runs exactly
/// once. Errors never escape: they become [`Outcome::Failed`] and are
/// recorded in the returned [`Statistics`]. There is no retry. Callers that
/// retry compose their loop around `call`, so every attempt is measured on
/// its own.
///
/// # Example
///
/// ```rust
/// use enrichment_steps::{with_statistics, Error, Outcome};
///
/// # tokio_test::block_on(async {
/// let halve = with_statistics(|x: i32| async move {
///     if x % 2 == 0 {
///         Ok(x / 2)
///     } else {
///         Err(Error::Execution(format!("{x} is odd")))
///     }
/// });
///
/// let (value, stats) = halve.call(10).await;
/// assert_eq!(value, Outcome::Value(5));
/// assert!(stats.success);
///
/// let (value, stats) = halve.call(3).await;
/// assert!(value.is_failed());
/// assert!(!stats.success);
/// # });
/// ```
pub struct Instrumented<F> {
    f: F,
    label: String,
}

/// Wrap `f` with timing and outcome capture.
pub fn with_statistics<F>(f: F) -> Instrumented<F> {
    Instrumented {
        f,
        label: std::any::type_name::<F>().to_string(),
    }
}

impl<F> Instrumented<F> {
    /// Replace the label used in log events.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The label used in log events.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Invoke the wrapped function once, returning its outcome and statistics.
    pub async fn call<I, O, Fut>(&self, input: I) -> (Outcome<O>, Statistics)
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<O>>,
    {
        let started_at = epoch_millis();
        let start = Instant::now();
        let result = (self.f)(input).await;
        let elapsed = start.elapsed();

        match result {
            Ok(value) => {
                tracing::debug!(
                    step = %self.label,
                    latency = elapsed.as_secs_f64(),
                    "call succeeded"
                );
                (Outcome::Value(value), Statistics::succeeded(started_at, elapsed))
            }
            Err(e) => {
                let failure = CallFailure::from(&e);
                tracing::warn!(
                    step = %self.label,
                    latency = elapsed.as_secs_f64(),
                    error = %failure,
                    "call failed"
                );
                (
                    Outcome::Failed(failure.clone()),
                    Statistics::failed(started_at, elapsed, failure),
                )
            }
        }
    }
}
