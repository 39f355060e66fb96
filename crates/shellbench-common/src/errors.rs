//! Error types for the shellbench harness.
//!
//! Failures fall into three groups:
//!
//! - [`Error`]: fatal problems (bad configuration, violated preconditions)
//!   that abort a run before any variant is launched.
//! - [`ProcessError`]: failures of a single process operation (spawn, kill,
//!   OS query). Callers decide whether to recover.
//! - [`BenchFailure`]: per-iteration failures that were recovered locally.
//!   They are logged in the run's failure log instead of being raised.
//!
//! ```rust
//! use shellbench_common::{Error, Result, ResultExt};
//!
//! fn load() -> Result<()> {
//!     Err(Error::configuration("variant 'legacy' is not defined"))
//! }
//!
//! fn run() -> Result<()> {
//!     load().context("Failed to prepare benchmark")
//! }
//!
//! assert!(run().unwrap_err().to_string().contains("legacy"));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MetricKind, VariantId};

/// Result type alias for fatal harness errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error type. Any of these aborts a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The environment does not satisfy a run precondition
    /// (e.g. a variant is already running before the first launch).
    #[error("Precondition violated: {message}")]
    Precondition { message: String },

    /// A state machine was asked for a transition it does not allow.
    #[error("Invalid state transition for {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    /// Internal error (shouldn't happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a Precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Creates an InvalidTransition error.
    pub fn invalid_transition(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Adds context to an error.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::WithContext {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error (or the error it wraps) is a configuration error.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration { .. } => true,
            Self::WithContext { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

// Convenience methods for Result types
pub trait ResultExt<T> {
    /// Adds context to an error result.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

// ==============================================================================
// Process Errors
// ==============================================================================

/// Errors raised by a single process operation.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    #[error("Process query failed: {id} - {reason}")]
    QueryFailed { id: String, reason: String },

    #[error("Invalid process pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },
}

impl ProcessError {
    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn query_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

impl From<ProcessError> for Error {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::InvalidPattern { .. } | ProcessError::Configuration { .. } => {
                Error::configuration(e.to_string())
            }
            other => Error::Internal(other.to_string()),
        }
    }
}

// ==============================================================================
// Per-iteration failures
// ==============================================================================

/// A failure that was recovered locally (skip-and-continue).
///
/// These never abort a run; they are collected so the result record can
/// explain why a metric ended up without data.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchFailure {
    /// The variant's command could not be spawned.
    #[error("Launch failed for {variant} (iteration {iteration}): {reason}")]
    LaunchFailure {
        variant: VariantId,
        iteration: u32,
        reason: String,
    },

    /// The process never appeared/disappeared within the bound.
    #[error("Detection timeout for {variant} (iteration {iteration}): {operation} after {timeout_ms}ms")]
    DetectionTimeout {
        variant: VariantId,
        iteration: u32,
        operation: String,
        timeout_ms: u64,
    },

    /// An OS query returned unusable output.
    #[error("Sample read failed for {variant}: {reason}")]
    SampleReadFailure { variant: VariantId, reason: String },

    /// A series finished with zero valid readings.
    #[error("No valid {metric} readings for {variant}")]
    EmptySeries {
        variant: VariantId,
        metric: MetricKind,
    },
}

impl BenchFailure {
    pub fn launch(variant: &VariantId, iteration: u32, reason: impl Into<String>) -> Self {
        Self::LaunchFailure {
            variant: variant.clone(),
            iteration,
            reason: reason.into(),
        }
    }

    pub fn detection_timeout(
        variant: &VariantId,
        iteration: u32,
        operation: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self::DetectionTimeout {
            variant: variant.clone(),
            iteration,
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn empty_series(variant: &VariantId, metric: MetricKind) -> Self {
        Self::EmptySeries {
            variant: variant.clone(),
            metric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context() {
        let err = Error::configuration("pattern is empty").context("Failed to load config");

        let message = err.to_string();
        assert!(message.contains("Failed to load config"));
        assert!(message.contains("pattern is empty"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_pattern_becomes_configuration_error() {
        let err: Error = ProcessError::invalid_pattern("(", "unclosed group").into();
        assert!(err.is_configuration());

        let err: Error = ProcessError::spawn_failed("legacy", "not found").into();
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_process_error_construction() {
        let error = ProcessError::spawn_failed("legacy", "executable not found");
        assert!(matches!(error, ProcessError::SpawnFailed { .. }));
        assert_eq!(
            error.to_string(),
            "Process spawn failed: legacy - executable not found"
        );
    }

    #[test]
    fn test_bench_failure_serializes_with_kind_tag() {
        let failure = BenchFailure::detection_timeout(&VariantId::from("tauri"), 2, "presence", 10_000);
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["kind"], "detection_timeout");
        assert_eq!(json["variant"], "tauri");
        assert_eq!(json["timeout_ms"], 10_000);
    }
}
