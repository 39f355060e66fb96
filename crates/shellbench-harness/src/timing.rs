//! TimingHarness - startup latency over repeated launches.
//!
//! Each iteration: make sure no instance is left, settle, launch, wait for
//! the process to show up, record the elapsed time, kill it and wait for it
//! to go away. An iteration that fails to launch or to show up contributes
//! no reading; the failure is logged in the series instead.

use shellbench_common::{BenchFailure, MetricKind};
use shellbench_process::{AppVariant, ProcessControl};
use shellbench_stats::SampleSeries;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct StartupPlan {
    pub iterations: u32,
    /// Run one untimed launch/terminate cycle first.
    pub warm: bool,
    pub settle_delay: Duration,
    pub presence_timeout: Duration,
    pub absence_timeout: Duration,
    pub inter_iteration_delay: Duration,
}

impl Default for StartupPlan {
    fn default() -> Self {
        Self {
            iterations: 5,
            warm: false,
            settle_delay: Duration::from_secs(1),
            presence_timeout: Duration::from_secs(10),
            absence_timeout: Duration::from_secs(5),
            inter_iteration_delay: Duration::from_millis(500),
        }
    }
}

pub struct TimingHarness {
    controller: Arc<dyn ProcessControl>,
    plan: StartupPlan,
}

impl TimingHarness {
    pub fn new(controller: Arc<dyn ProcessControl>, plan: StartupPlan) -> Self {
        Self { controller, plan }
    }

    /// Measure startup latency `plan.iterations` times.
    pub async fn measure_startup(&self, variant: &AppVariant) -> SampleSeries {
        let mut series = SampleSeries::new(MetricKind::StartupLatencyMs);

        if self.plan.warm {
            self.warm_up(variant).await;
        }

        for iteration in 1..=self.plan.iterations {
            match self.run_iteration(variant, iteration).await {
                Ok(elapsed_ms) => {
                    info!(
                        "Startup {}/{} for {}: {:.0}ms",
                        iteration, self.plan.iterations, variant.id, elapsed_ms
                    );
                    series.push(elapsed_ms);
                }
                Err(failure) => {
                    warn!("Skipping iteration {} for {}: {}", iteration, variant.id, failure);
                    series.record_failure(failure);
                }
            }

            if !self.plan.inter_iteration_delay.is_zero() {
                sleep(self.plan.inter_iteration_delay).await;
            }
        }

        if series.is_empty() {
            series.record_failure(BenchFailure::empty_series(
                &variant.id,
                MetricKind::StartupLatencyMs,
            ));
        }
        series
    }

    async fn run_iteration(&self, variant: &AppVariant, iteration: u32) -> Result<f64, BenchFailure> {
        // A lingering instance would be detected instantly and fake a 0ms start.
        if !self.stop(variant).await {
            return Err(BenchFailure::detection_timeout(
                &variant.id,
                iteration,
                "absence",
                self.plan.absence_timeout.as_millis() as u64,
            ));
        }

        if !self.plan.settle_delay.is_zero() {
            sleep(self.plan.settle_delay).await;
        }

        let start = Instant::now();
        if let Err(e) = self.controller.launch(variant).await {
            return Err(BenchFailure::launch(&variant.id, iteration, e.to_string()));
        }

        let found = self
            .controller
            .await_presence(variant, self.plan.presence_timeout)
            .await;
        let elapsed = start.elapsed();

        self.stop(variant).await;

        if found {
            Ok(elapsed.as_micros() as f64 / 1000.0)
        } else {
            Err(BenchFailure::detection_timeout(
                &variant.id,
                iteration,
                "presence",
                self.plan.presence_timeout.as_millis() as u64,
            ))
        }
    }

    async fn warm_up(&self, variant: &AppVariant) {
        debug!("Warm-up cycle for {}", variant.id);
        self.stop(variant).await;

        match self.controller.launch(variant).await {
            Ok(_) => {
                if !self
                    .controller
                    .await_presence(variant, self.plan.presence_timeout)
                    .await
                {
                    warn!("Warm-up launch of {} was never detected", variant.id);
                }
            }
            Err(e) => warn!("Warm-up launch of {} failed: {}", variant.id, e),
        }

        self.stop(variant).await;
    }

    /// Kill the variant and wait until it is gone. `false` if it lingers.
    async fn stop(&self, variant: &AppVariant) -> bool {
        if let Err(e) = self.controller.terminate(variant).await {
            warn!("Failed to terminate {}: {}", variant.id, e);
        }
        self.controller
            .await_absence(variant, self.plan.absence_timeout)
            .await
    }
}
