//! Cross-variant comparison.
//!
//! Every metric the harness collects is "lower is better", so a positive
//! improvement means the candidate uses less time, memory or CPU than the
//! baseline.

use crate::summary::{MetricSummaries, SummaryStatistics};
use serde::{Deserialize, Serialize};
use shellbench_common::{MetricKind, VariantId};
use std::collections::BTreeMap;
use tracing::debug;

/// Improvement of the candidate over the baseline for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    /// `absolute / baseline.avg * 100`, rounded to one decimal.
    /// Serialised as a string with exactly one decimal (`"80.0"`).
    #[serde(with = "one_decimal")]
    pub percentage: f64,
    /// `baseline.avg - candidate.avg`, unrounded.
    pub absolute: f64,
}

/// Compare two summaries of the same metric.
///
/// Returns `None` when either side has no data or the baseline average is
/// zero.
pub fn compare(
    baseline: Option<&SummaryStatistics>,
    candidate: Option<&SummaryStatistics>,
) -> Option<Improvement> {
    let (baseline, candidate) = (baseline?, candidate?);
    if baseline.avg == 0.0 {
        return None;
    }

    let absolute = baseline.avg - candidate.avg;
    let percentage = round_one_decimal(absolute / baseline.avg * 100.0);
    Some(Improvement {
        percentage,
        absolute,
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Comparison of a candidate variant against a baseline variant.
///
/// Metrics for which [`compare`] returned `None` are absent from `metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline: VariantId,
    pub candidate: VariantId,
    pub metrics: BTreeMap<MetricKind, Improvement>,
}

impl ComparisonResult {
    pub fn build(
        baseline: &VariantId,
        baseline_stats: &MetricSummaries,
        candidate: &VariantId,
        candidate_stats: &MetricSummaries,
    ) -> Self {
        let mut metrics = BTreeMap::new();
        for kind in MetricKind::ALL {
            let b = baseline_stats.get(&kind).and_then(Option::as_ref);
            let c = candidate_stats.get(&kind).and_then(Option::as_ref);
            match compare(b, c) {
                Some(improvement) => {
                    metrics.insert(kind, improvement);
                }
                None => debug!("No comparison for {}: missing data or zero baseline", kind),
            }
        }

        Self {
            baseline: baseline.clone(),
            candidate: candidate.clone(),
            metrics,
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<&Improvement> {
        self.metrics.get(&kind)
    }
}

/// Serde helper writing an `f64` as a one-decimal string.
pub mod one_decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:.1}", value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.trim().parse::<f64>().map_err(serde::de::Error::custom)
    }
}
