//! Core identifiers shared across the harness crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Variant identifier - uniquely identifies one application build under test.
///
/// # Example
/// ```
/// use shellbench_common::VariantId;
///
/// let id = VariantId::from("legacy");
/// assert_eq!(id.as_str(), "legacy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    /// Creates a new VariantId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the variant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VariantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VariantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The metric a series of readings measures.
///
/// A series never mixes kinds, so the kind travels with the readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Wall-clock time from launch to first detection, in milliseconds.
    StartupLatencyMs,
    /// Resident memory summed over matching processes, in MB.
    MemoryMb,
    /// CPU usage normalised to 0-100 across all logical CPUs.
    CpuPercent,
}

impl MetricKind {
    /// All metric kinds, in report order.
    pub const ALL: [MetricKind; 3] = [
        MetricKind::StartupLatencyMs,
        MetricKind::MemoryMb,
        MetricKind::CpuPercent,
    ];

    /// Returns the metric name as used in result records.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::StartupLatencyMs => "startup_latency_ms",
            MetricKind::MemoryMb => "memory_mb",
            MetricKind::CpuPercent => "cpu_percent",
        }
    }

    /// Returns true for metrics that are sampled from a running process
    /// (as opposed to measured across launches).
    pub fn is_resource(&self) -> bool {
        matches!(self, MetricKind::MemoryMb | MetricKind::CpuPercent)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name of the host platform family, as recorded in result records.
pub fn platform_name() -> &'static str {
    std::env::consts::OS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_id() {
        let id = VariantId::from("tauri-shell");
        assert_eq!(id.as_str(), "tauri-shell");
        assert_eq!(id.to_string(), "tauri-shell");
    }

    #[test]
    fn test_metric_kind_names_match_serde() {
        for kind in MetricKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_resource_metrics() {
        assert!(!MetricKind::StartupLatencyMs.is_resource());
        assert!(MetricKind::MemoryMb.is_resource());
        assert!(MetricKind::CpuPercent.is_resource());
    }
}
