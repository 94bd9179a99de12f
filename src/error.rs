//! Error types for step execution.

use thiserror::Error;

/// The main error type for step and pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Deriving the call input from a row failed.
    ///
    /// This is a pipeline-definition bug and is never captured in statistics.
    #[error("Derivation error in step '{step_name}': {message}")]
    Derivation {
        /// The name of the step whose derivation failed.
        step_name: String,
        /// What went wrong.
        message: String,
    },

    /// A step or client was configured incorrectly.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external call did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The external HTTP call failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error occurred during execution.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Stable snake_case label for this error's variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Derivation { .. } => "derivation",
            Error::Config(_) => "config",
            Error::Timeout(_) => "timeout",
            Error::Http(_) => "http",
            Error::Execution(_) => "execution",
            Error::Json(_) => "json",
            Error::Message(_) => "message",
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

/// A specialized `Result` type for step operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::Timeout("slow".into()).kind(), "timeout");
        assert_eq!(Error::from("boom").kind(), "message");
        let err = Error::Derivation {
            step_name: "serp".to_string(),
            message: "missing field".to_string(),
        };
        assert_eq!(err.kind(), "derivation");
        assert_eq!(
            err.to_string(),
            "Derivation error in step 'serp': missing field"
        );
    }
}
