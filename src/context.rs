//! Execution context for pipeline runs.
//!
//! This module provides the `ExecutionContext` which the pipeline threads
//! through every row, collecting per-step metrics and trace events.

use std::sync::{Arc, Mutex};

use crate::events::{PipelineEvent, TraceEntry};
use crate::metrics::PipelineMetrics;
use crate::step::StepResult;

/// Context shared by every row of a pipeline run.
///
/// This context is cloneable and thread-safe, allowing it to be shared
/// across rows processed concurrently. All updates are synchronized.
///
/// # Example
///
/// ```rust
/// use enrichment_steps::{ExecutionContext, PipelineEvent};
///
/// let ctx = ExecutionContext::new();
/// ctx.emit(PipelineEvent::StepStart {
///     step_name: "serp".to_string(),
///     row: 0,
/// });
/// assert_eq!(ctx.trace_snapshot().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Shared metrics accumulator.
    pub metrics: Arc<Mutex<PipelineMetrics>>,
    /// Shared trace log for structured pipeline events.
    pub traces: Arc<Mutex<Vec<TraceEntry>>>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Create a new execution context with empty metrics and traces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(PipelineMetrics::default())),
            traces: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fold a step result into the metrics and emit its end or error event.
    pub fn record_result(&self, step_name: &str, row: usize, result: &StepResult) {
        self.metrics
            .lock()
            .unwrap()
            .record(step_name, &result.statistics);

        let event = match &result.statistics.error {
            None => PipelineEvent::StepEnd {
                step_name: step_name.to_string(),
                row,
                latency: result.statistics.latency,
            },
            Some(error) => PipelineEvent::Error {
                step_name: step_name.to_string(),
                row,
                message: error.to_string(),
            },
        };
        self.emit(event);
    }

    /// Increment the rows processed counter.
    pub fn record_row(&self) {
        self.metrics.lock().unwrap().record_row();
    }

    /// Get a snapshot of the current metrics.
    #[must_use]
    pub fn snapshot(&self) -> PipelineMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// Emit a structured pipeline event to the trace log.
    ///
    /// Events are timestamped automatically when emitted.
    pub fn emit(&self, event: PipelineEvent) {
        let entry = TraceEntry::new(event);
        self.traces.lock().unwrap().push(entry);
    }

    /// Get a snapshot of the current trace log.
    #[must_use]
    pub fn trace_snapshot(&self) -> Vec<TraceEntry> {
        self.traces.lock().unwrap().clone()
    }

    /// Clear all trace entries.
    pub fn clear_traces(&self) {
        self.traces.lock().unwrap().clear();
    }
}
