//! Tagged outcome of an instrumented call.
//!
//! [`Outcome`] is the explicit error marker placed into a step's fields. A
//! failed call is never represented as `null` or an empty value, so a
//! legitimately empty result can always be told apart from a failure.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Kind and message of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFailure {
    /// Stable label of the error variant, e.g. `"timeout"` or `"http"`.
    pub kind: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl CallFailure {
    /// Create a failure from a kind label and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<&Error> for CallFailure {
    fn from(err: &Error) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The value a step produced for one field, or the failure that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum Outcome<T = serde_json::Value> {
    /// The call succeeded with this value.
    Value(T),
    /// The call failed.
    Failed(CallFailure),
}

impl<T> Outcome<T> {
    /// Returns `true` if this outcome carries a value.
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    /// Returns `true` if this outcome is the error marker.
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Failed(_) => None,
        }
    }

    /// Borrow the failure, if any.
    pub fn failure(&self) -> Option<&CallFailure> {
        match self {
            Outcome::Value(_) => None,
            Outcome::Failed(f) => Some(f),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> std::result::Result<T, CallFailure> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Failed(f) => Err(f),
        }
    }
}

impl<T> From<crate::Result<T>> for Outcome<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Failed(CallFailure::from(&e)),
        }
    }
}
