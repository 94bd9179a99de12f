//! Aggregated statistics across rows.
//!
//! This module provides `StepMetrics` for per-step success/failure and
//! latency totals, and `PipelineMetrics` which keys them by step name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::statistics::Statistics;

/// Aggregated statistics of one step across every row it ran on.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Number of calls that succeeded.
    pub num_success: usize,
    /// Number of calls that failed.
    pub num_failure: usize,
    /// Sum of call latencies in seconds.
    pub total_latency: f64,
    /// Collected failure messages.
    pub failures: Vec<String>,
}

impl StepMetrics {
    /// Fold one call's statistics into the totals.
    pub fn record(&mut self, statistics: &Statistics) {
        self.total_latency += statistics.latency;
        if statistics.success {
            self.num_success += 1;
        } else {
            self.num_failure += 1;
            if let Some(error) = &statistics.error {
                self.failures.push(error.to_string());
            }
        }
    }

    /// Total number of calls recorded.
    pub fn calls(&self) -> usize {
        self.num_success + self.num_failure
    }

    /// Fraction of calls that succeeded, or `None` if nothing ran.
    pub fn success_rate(&self) -> Option<f64> {
        match self.calls() {
            0 => None,
            n => Some(self.num_success as f64 / n as f64),
        }
    }

    /// Mean latency in seconds, or `None` if nothing ran.
    pub fn mean_latency(&self) -> Option<f64> {
        match self.calls() {
            0 => None,
            n => Some(self.total_latency / n as f64),
        }
    }
}

/// Aggregated metrics for a pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    /// Number of rows that went through every step.
    pub rows_processed: usize,
    /// Per-step totals keyed by step name, in first-seen order.
    pub steps: IndexMap<String, StepMetrics>,
}

impl PipelineMetrics {
    /// Record one step result's statistics under `step_name`.
    pub fn record(&mut self, step_name: &str, statistics: &Statistics) {
        self.steps
            .entry(step_name.to_string())
            .or_default()
            .record(statistics);
    }

    /// Increment the rows processed counter.
    pub fn record_row(&mut self) {
        self.rows_processed += 1;
    }

    /// Totals for one step.
    pub fn step(&self, name: &str) -> Option<&StepMetrics> {
        self.steps.get(name)
    }

    /// Check if any step recorded a failure.
    pub fn has_failures(&self) -> bool {
        self.steps.values().any(|s| s.num_failure > 0)
    }

    /// Sum of latencies across all steps, in seconds.
    pub fn total_latency(&self) -> f64 {
        self.steps.values().map(|s| s.total_latency).sum()
    }
}
