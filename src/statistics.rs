//! Per-call execution statistics.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::outcome::CallFailure;

/// Execution metadata captured for a single instrumented call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Wall-clock time of the call in seconds. Never negative.
    pub latency: f64,
    /// Whether the call completed without error.
    pub success: bool,
    /// Kind and message of the failure, present iff `success` is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallFailure>,
    /// Unix epoch milliseconds at which the call started.
    pub started_at: u128,
}

impl Statistics {
    /// Statistics for a call that succeeded.
    pub fn succeeded(started_at: u128, elapsed: Duration) -> Self {
        Self {
            latency: elapsed.as_secs_f64(),
            success: true,
            error: None,
            started_at,
        }
    }

    /// Statistics for a call that failed with `failure`.
    pub fn failed(started_at: u128, elapsed: Duration, failure: CallFailure) -> Self {
        Self {
            latency: elapsed.as_secs_f64(),
            success: false,
            error: Some(failure),
            started_at,
        }
    }

    /// The latency as a [`Duration`].
    pub fn latency_duration(&self) -> Duration {
        Duration::from_secs_f64(self.latency.max(0.0))
    }
}

/// Current Unix epoch time in milliseconds.
pub(crate) fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_statistics_carry_error() {
        let stats = Statistics::failed(
            0,
            Duration::from_millis(250),
            CallFailure::new("timeout", "deadline exceeded"),
        );
        assert!(!stats.success);
        assert_eq!(stats.latency, 0.25);
        assert_eq!(stats.error.as_ref().map(|e| e.kind.as_str()), Some("timeout"));

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"latency\":0.25"));
        assert!(json.contains("\"success\":false"));
    }

    #[test]
    fn test_success_omits_error() {
        let stats = Statistics::succeeded(epoch_millis(), Duration::from_millis(5));
        let json = serde_json::to_string(&stats).unwrap();
        assert!(!json.contains("\"error\""));
        assert!((stats.latency_duration().as_secs_f64() - 0.005).abs() < 1e-6);
    }
}
