//! Reduction of a series into summary statistics.

use crate::series::SampleSeries;
use serde::{Deserialize, Serialize};
use shellbench_common::MetricKind;
use std::collections::BTreeMap;

/// Summary of a finished series.
///
/// Whenever `count > 0`: `min <= median <= max` and `min <= avg <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Per-metric summaries of one variant. `None` is "N/A": the series had no
/// valid readings.
pub type MetricSummaries = BTreeMap<MetricKind, Option<SummaryStatistics>>;

/// Summarize a series. An empty series has no summary.
pub fn summarize(series: &SampleSeries) -> Option<SummaryStatistics> {
    summarize_values(series.readings())
}

/// Summarize raw readings.
///
/// The median is `sorted[len / 2]`: for an even number of readings this is
/// the upper of the two middle values, never an interpolation.
pub fn summarize_values(values: &[f64]) -> Option<SummaryStatistics> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let sum: f64 = sorted.iter().sum();
    let min = sorted[0];
    let max = sorted[count - 1];
    // Float summation can land a hair outside [min, max] for constant series.
    let avg = (sum / count as f64).clamp(min, max);

    Some(SummaryStatistics {
        count,
        avg,
        min,
        max,
        median: sorted[count / 2],
    })
}
