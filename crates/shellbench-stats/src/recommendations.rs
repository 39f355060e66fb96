//! Threshold-based recommendations.

use crate::summary::MetricSummaries;
use serde::{Deserialize, Serialize};
use shellbench_common::MetricKind;

/// Emitted when no threshold is breached.
pub const WITHIN_RANGES: &str = "All metrics within acceptable ranges";

/// Upper bounds on a variant's average for each metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub startup_ms: f64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            startup_ms: 3000.0,
            memory_mb: 100.0,
            cpu_percent: 5.0,
        }
    }
}

impl Thresholds {
    pub fn limit(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::StartupLatencyMs => self.startup_ms,
            MetricKind::MemoryMb => self.memory_mb,
            MetricKind::CpuPercent => self.cpu_percent,
        }
    }
}

fn breach_message(kind: MetricKind, avg: f64, limit: f64) -> String {
    match kind {
        MetricKind::StartupLatencyMs => format!(
            "Startup time is too slow: average {:.0}ms exceeds the {:.0}ms threshold",
            avg, limit
        ),
        MetricKind::MemoryMb => format!(
            "Memory usage is too high: average {:.1}MB exceeds the {:.0}MB threshold",
            avg, limit
        ),
        MetricKind::CpuPercent => format!(
            "CPU usage is too high: average {:.1}% exceeds the {:.1}% threshold",
            avg, limit
        ),
    }
}

/// Build recommendations for one variant's summaries.
///
/// One message per breached threshold. Metrics without data add an `N/A`
/// note but do not count as a breach. If nothing was breached the list
/// ends with [`WITHIN_RANGES`].
pub fn recommend(summaries: &MetricSummaries, thresholds: &Thresholds) -> Vec<String> {
    let mut recommendations = Vec::new();
    let mut breached = false;

    for kind in MetricKind::ALL {
        match summaries.get(&kind) {
            Some(Some(stats)) => {
                let limit = thresholds.limit(kind);
                if stats.avg > limit {
                    recommendations.push(breach_message(kind, stats.avg, limit));
                    breached = true;
                }
            }
            Some(None) => recommendations.push(format!("{}: N/A (no valid readings)", kind)),
            None => {}
        }
    }

    if !breached {
        recommendations.push(WITHIN_RANGES.to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::summarize_values;

    fn summaries(startup: &[f64], memory: &[f64], cpu: &[f64]) -> MetricSummaries {
        let mut map = MetricSummaries::new();
        map.insert(MetricKind::StartupLatencyMs, summarize_values(startup));
        map.insert(MetricKind::MemoryMb, summarize_values(memory));
        map.insert(MetricKind::CpuPercent, summarize_values(cpu));
        map
    }

    #[test]
    fn test_within_ranges() {
        let recs = recommend(&summaries(&[800.0], &[45.0], &[1.2]), &Thresholds::default());
        assert_eq!(recs, vec![WITHIN_RANGES.to_string()]);
    }

    #[test]
    fn test_one_message_per_breach() {
        let recs = recommend(
            &summaries(&[3500.0, 3700.0], &[180.0], &[2.0]),
            &Thresholds::default(),
        );

        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("Startup time"));
        assert!(recs[0].contains("3600ms"));
        assert!(recs[1].contains("Memory usage"));
        assert!(!recs.iter().any(|r| r == WITHIN_RANGES));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let recs = recommend(&summaries(&[3000.0], &[100.0], &[5.0]), &Thresholds::default());
        assert_eq!(recs, vec![WITHIN_RANGES.to_string()]);
    }

    #[test]
    fn test_missing_data_is_reported_not_breached() {
        let recs = recommend(&summaries(&[], &[50.0], &[]), &Thresholds::default());

        assert_eq!(recs.len(), 3);
        assert!(recs[0].starts_with("startup_latency_ms: N/A"));
        assert!(recs[1].starts_with("cpu_percent: N/A"));
        assert_eq!(recs[2], WITHIN_RANGES);
    }
}
