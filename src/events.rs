//! Structured pipeline execution events for tracing and observability.
//!
//! This module defines the event types emitted while a pipeline runs,
//! enabling detailed tracking of step execution per row.

use serde::{Deserialize, Serialize};

use crate::statistics::epoch_millis;

/// Events that can be emitted during pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PipelineEvent {
    /// A step has started on a row.
    StepStart {
        /// Name of the step being executed.
        step_name: String,
        /// Index of the row in the input table.
        row: usize,
    },
    /// A step finished on a row and its call succeeded.
    StepEnd {
        /// Name of the step that completed.
        step_name: String,
        /// Index of the row in the input table.
        row: usize,
        /// Call latency in seconds.
        latency: f64,
    },
    /// A step's call failed on a row, or the step itself errored.
    Error {
        /// Name of the step where the error occurred.
        step_name: String,
        /// Index of the row in the input table.
        row: usize,
        /// Error message describing what went wrong.
        message: String,
    },
}

/// A timestamped trace entry containing a pipeline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unix epoch timestamp in milliseconds when this event occurred.
    pub timestamp: u128,
    /// The pipeline event that was recorded.
    #[serde(flatten)]
    pub event: PipelineEvent,
}

impl TraceEntry {
    /// Create a new trace entry with the current timestamp.
    #[must_use]
    pub fn new(event: PipelineEvent) -> Self {
        Self {
            timestamp: epoch_millis(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_entry_serialization() {
        let entry = TraceEntry::new(PipelineEvent::StepStart {
            step_name: "serp".to_string(),
            row: 3,
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"StepStart\""));
        assert!(json.contains("\"step_name\":\"serp\""));
        assert!(json.contains("\"timestamp\":"));
    }

    #[test]
    fn test_error_event() {
        let event = PipelineEvent::Error {
            step_name: "serp".to_string(),
            row: 0,
            message: "timeout: request timed out".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Error\""));
        assert!(json.contains("\"row\":0"));
    }
}
