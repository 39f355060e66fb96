//! SampleSeries - ordered readings for one metric.

use shellbench_common::{BenchFailure, MetricKind};
use tracing::debug;

/// Readings for one metric, in the order they were taken.
///
/// The series is append-only: readings can be pushed but never removed or
/// reordered. Non-positive and non-finite readings mean "nothing measured
/// this tick" and are counted as dropped instead of stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    kind: MetricKind,
    readings: Vec<f64>,
    dropped: u32,
    failures: Vec<BenchFailure>,
}

impl SampleSeries {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            readings: Vec::new(),
            dropped: 0,
            failures: Vec::new(),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Number of readings that were discarded as "no reading".
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn failures(&self) -> &[BenchFailure] {
        &self.failures
    }

    /// Append a reading. Returns `false` (and counts a drop) for readings
    /// that are zero, negative or not finite.
    pub fn push(&mut self, reading: f64) -> bool {
        if reading.is_finite() && reading > 0.0 {
            self.readings.push(reading);
            true
        } else {
            debug!("Dropped {} reading: {}", self.kind, reading);
            self.dropped += 1;
            false
        }
    }

    /// Record an iteration that produced no reading.
    pub fn record_failure(&mut self, failure: BenchFailure) {
        self.failures.push(failure);
    }

    /// Hand the failure log over to the caller, e.g. a run context.
    pub fn take_failures(&mut self) -> Vec<BenchFailure> {
        std::mem::take(&mut self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellbench_common::VariantId;

    #[test]
    fn test_push_keeps_order_and_drops_zero() {
        let mut series = SampleSeries::new(MetricKind::MemoryMb);

        assert!(series.push(120.5));
        assert!(!series.push(0.0));
        assert!(series.push(118.0));
        assert!(!series.push(f64::NAN));
        assert!(!series.push(-3.0));

        assert_eq!(series.readings(), &[120.5, 118.0]);
        assert_eq!(series.dropped(), 3);
        assert_eq!(series.kind(), MetricKind::MemoryMb);
    }

    #[test]
    fn test_failures_are_kept_apart_from_readings() {
        let mut series = SampleSeries::new(MetricKind::StartupLatencyMs);
        series.record_failure(BenchFailure::launch(&VariantId::from("legacy"), 1, "not found"));

        assert!(series.is_empty());
        assert_eq!(series.failures().len(), 1);
        assert_eq!(series.take_failures().len(), 1);
        assert!(series.failures().is_empty());
    }
}
