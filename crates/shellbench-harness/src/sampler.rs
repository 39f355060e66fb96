//! Sampler - fixed-interval memory/CPU polling over a bounded window.
//!
//! Zero readings mean "nothing found this tick" and are dropped by the
//! series. A target that vanishes mid-window does not end the window early;
//! the remaining ticks simply produce no readings.

use shellbench_common::{BenchFailure, MetricKind};
use shellbench_process::{AppVariant, ProcessControl, ProcessInspector};
use shellbench_stats::SampleSeries;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

pub struct Sampler {
    controller: Arc<dyn ProcessControl>,
    inspector: Arc<dyn ProcessInspector>,
    settle_delay: Duration,
    presence_timeout: Duration,
    absence_timeout: Duration,
}

impl Sampler {
    pub fn new(controller: Arc<dyn ProcessControl>, inspector: Arc<dyn ProcessInspector>) -> Self {
        Self {
            controller,
            inspector,
            settle_delay: Duration::ZERO,
            presence_timeout: Duration::from_secs(10),
            absence_timeout: Duration::from_secs(5),
        }
    }

    /// Wait this long after the variant is up before the first tick.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_timeouts(mut self, presence: Duration, absence: Duration) -> Self {
        self.presence_timeout = presence;
        self.absence_timeout = absence;
        self
    }

    /// Collect one metric for `duration`, one reading every `interval`.
    pub async fn collect(
        &self,
        variant: &AppVariant,
        kind: MetricKind,
        duration: Duration,
        interval: Duration,
    ) -> SampleSeries {
        let mut series = self.collect_all(variant, &[kind], duration, interval).await;
        series.pop().unwrap_or_else(|| SampleSeries::new(kind))
    }

    /// Collect several metrics in one window, one series per kind in the
    /// order given. Each tick takes a single snapshot for all of them.
    pub async fn collect_all(
        &self,
        variant: &AppVariant,
        kinds: &[MetricKind],
        duration: Duration,
        interval: Duration,
    ) -> Vec<SampleSeries> {
        let mut series: Vec<SampleSeries> = kinds.iter().map(|k| SampleSeries::new(*k)).collect();

        if let Err(failure) = self.ensure_running(variant).await {
            warn!("Sampling skipped for {}: {}", variant.id, failure);
            for s in &mut series {
                s.record_failure(failure.clone());
            }
            self.stop(variant).await;
            return series;
        }

        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }

        info!(
            "Sampling {} for {:?} every {:?}",
            variant.id, duration, interval
        );
        let start = Instant::now();
        let mut read_failed = false;

        while start.elapsed() < duration {
            sleep(interval).await;

            match self.inspector.snapshot(&variant.pattern) {
                Ok(snapshot) => {
                    for s in &mut series {
                        s.push(snapshot.reading(s.kind()));
                    }
                }
                Err(e) => {
                    debug!("Sample read failed for {}: {}", variant.id, e);
                    for s in &mut series {
                        s.push(0.0);
                        // One entry per series is enough to explain gaps.
                        if !read_failed {
                            s.record_failure(BenchFailure::SampleReadFailure {
                                variant: variant.id.clone(),
                                reason: e.to_string(),
                            });
                        }
                    }
                    read_failed = true;
                }
            }
        }

        self.stop(variant).await;

        for s in &mut series {
            if s.is_empty() {
                warn!("No valid {} readings for {}", s.kind(), variant.id);
                s.record_failure(BenchFailure::empty_series(&variant.id, s.kind()));
            } else {
                debug!(
                    "Collected {} {} readings for {} ({} dropped)",
                    s.len(),
                    s.kind(),
                    variant.id,
                    s.dropped()
                );
            }
        }

        series
    }

    async fn ensure_running(&self, variant: &AppVariant) -> Result<(), BenchFailure> {
        if self.controller.is_running(variant) {
            return Ok(());
        }

        self.controller
            .launch(variant)
            .await
            .map_err(|e| BenchFailure::launch(&variant.id, 0, e.to_string()))?;

        if self
            .controller
            .await_presence(variant, self.presence_timeout)
            .await
        {
            Ok(())
        } else {
            Err(BenchFailure::detection_timeout(
                &variant.id,
                0,
                "presence",
                self.presence_timeout.as_millis() as u64,
            ))
        }
    }

    async fn stop(&self, variant: &AppVariant) {
        match self.controller.terminate(variant).await {
            Ok(_) => {
                self.controller
                    .await_absence(variant, self.absence_timeout)
                    .await;
            }
            Err(e) => warn!("Failed to terminate {} after sampling: {}", variant.id, e),
        }
    }
}
