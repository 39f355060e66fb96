//! # Shellbench Common
//!
//! Common types shared across the shellbench harness.
//!
//! This crate provides the foundational pieces the other crates build upon:
//! the error taxonomy and the identifiers for variants and metrics.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{BenchFailure, Error, ProcessError, ProcessResult, Result, ResultExt};
pub use types::{platform_name, MetricKind, VariantId};
