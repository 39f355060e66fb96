//! Per-run state and the result record handed to report generators.
//!
//! A [`RunContext`] is created for every harness invocation and threaded
//! through the run; nothing accumulates across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shellbench_common::{platform_name, BenchFailure, MetricKind, VariantId};
use shellbench_resilience::OutageReport;
use shellbench_stats::{summarize, ComparisonResult, Improvement, MetricSummaries, SampleSeries};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    Baseline,
    Comparison,
    NetworkTest,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Baseline => write!(f, "baseline"),
            RunMode::Comparison => write!(f, "comparison"),
            RunMode::NetworkTest => write!(f, "network-test"),
        }
    }
}

/// Structured outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub timestamp: DateTime<Utc>,
    pub platform: String,
    pub mode: RunMode,
    /// `null` summaries are "N/A": no valid readings.
    pub variant_results: BTreeMap<VariantId, MetricSummaries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<VariantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<VariantId>,
    pub comparisons: BTreeMap<MetricKind, Improvement>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<OutageReport>,
    pub failures: Vec<BenchFailure>,
}

#[derive(Debug)]
pub struct RunContext {
    mode: RunMode,
    started_at: DateTime<Utc>,
    variant_results: BTreeMap<VariantId, MetricSummaries>,
    comparison: Option<ComparisonResult>,
    recommendations: Vec<String>,
    network: Option<OutageReport>,
    failures: Vec<BenchFailure>,
}

impl RunContext {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            started_at: Utc::now(),
            variant_results: BTreeMap::new(),
            comparison: None,
            recommendations: Vec::new(),
            network: None,
            failures: Vec::new(),
        }
    }

    /// Fold a finished series into the variant's summaries. The series'
    /// failure log moves into the run's.
    pub fn record_series(&mut self, variant: &VariantId, mut series: SampleSeries) {
        let summary = summarize(&series);
        match summary {
            Some(ref stats) => info!(
                "{} {}: avg={:.2} min={:.2} max={:.2} median={:.2} (n={})",
                variant,
                series.kind(),
                stats.avg,
                stats.min,
                stats.max,
                stats.median,
                stats.count
            ),
            None => info!("{} {}: N/A", variant, series.kind()),
        }

        self.failures.extend(series.take_failures());
        self.variant_results
            .entry(variant.clone())
            .or_default()
            .insert(series.kind(), summary);
    }

    pub fn summaries(&self, variant: &VariantId) -> Option<&MetricSummaries> {
        self.variant_results.get(variant)
    }

    pub fn set_comparison(&mut self, comparison: ComparisonResult) {
        self.comparison = Some(comparison);
    }

    pub fn set_recommendations(&mut self, recommendations: Vec<String>) {
        self.recommendations = recommendations;
    }

    pub fn set_network(&mut self, mut report: OutageReport) {
        self.failures.append(&mut report.failures);
        self.network = Some(report);
    }

    pub fn into_record(self) -> ResultRecord {
        let (baseline, candidate, comparisons) = match self.comparison {
            Some(c) => (Some(c.baseline), Some(c.candidate), c.metrics),
            None => (None, None, BTreeMap::new()),
        };

        ResultRecord {
            timestamp: self.started_at,
            platform: platform_name().to_string(),
            mode: self.mode,
            variant_results: self.variant_results,
            baseline,
            candidate,
            comparisons,
            recommendations: self.recommendations,
            network: self.network,
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series_is_recorded_as_na() {
        let id = VariantId::from("tauri");
        let mut series = SampleSeries::new(MetricKind::CpuPercent);
        series.record_failure(BenchFailure::empty_series(&id, MetricKind::CpuPercent));

        let mut ctx = RunContext::new(RunMode::Baseline);
        ctx.record_series(&id, series);
        let record = ctx.into_record();

        assert_eq!(record.variant_results[&id][&MetricKind::CpuPercent], None);
        assert_eq!(record.failures.len(), 1);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["variant_results"]["tauri"]["cpu_percent"].is_null());
        assert_eq!(json["mode"], "baseline");
        assert!(json.get("network").is_none());
    }

    #[test]
    fn test_record_carries_comparison() {
        let legacy = VariantId::from("electron");
        let tauri = VariantId::from("tauri");
        let mut ctx = RunContext::new(RunMode::Comparison);

        for (id, value) in [(&legacy, 5000.0), (&tauri, 1000.0)] {
            let mut series = SampleSeries::new(MetricKind::StartupLatencyMs);
            series.push(value);
            ctx.record_series(id, series);
        }

        let comparison = ComparisonResult::build(
            &legacy,
            ctx.summaries(&legacy).unwrap(),
            &tauri,
            ctx.summaries(&tauri).unwrap(),
        );
        ctx.set_comparison(comparison);
        let record = ctx.into_record();

        assert_eq!(record.baseline, Some(legacy));
        assert_eq!(
            record.comparisons[&MetricKind::StartupLatencyMs].percentage,
            80.0
        );
        assert_eq!(record.platform, std::env::consts::OS);
    }
}
