//! Startup timing and resource sampling against a real process.

#![cfg(target_os = "linux")]

use e2e_tests::SleepFixture;
use shellbench_common::MetricKind;
use shellbench_harness::{Sampler, StartupPlan, TimingHarness};
use shellbench_process::{ProcessControl, ProcessController, ProcessInspector, SysinfoInspector};
use std::sync::Arc;
use std::time::Duration;

fn components() -> (Arc<dyn ProcessControl>, Arc<dyn ProcessInspector>) {
    let inspector: Arc<dyn ProcessInspector> = Arc::new(SysinfoInspector::new());
    let controller = ProcessController::new(Arc::clone(&inspector))
        .with_poll_interval(Duration::from_millis(50));
    (Arc::new(controller), inspector)
}

#[tokio::test]
async fn test_startup_latency_over_iterations() {
    let fixture = SleepFixture::new("st");
    let variant = fixture.variant("sleepy");
    let (controller, _) = components();

    let timing = TimingHarness::new(
        Arc::clone(&controller),
        StartupPlan {
            iterations: 3,
            warm: true,
            settle_delay: Duration::from_millis(50),
            presence_timeout: Duration::from_secs(5),
            absence_timeout: Duration::from_secs(5),
            inter_iteration_delay: Duration::from_millis(50),
        },
    );

    let series = timing.measure_startup(&variant).await;

    assert_eq!(series.kind(), MetricKind::StartupLatencyMs);
    assert_eq!(series.len(), 3, "failures: {:?}", series.failures());
    assert!(series.readings().iter().all(|ms| *ms > 0.0));
    assert!(series.failures().is_empty());
    assert!(!controller.is_running(&variant));
}

#[tokio::test]
async fn test_memory_sampling_window() {
    let fixture = SleepFixture::new("sm");
    let variant = fixture.variant("sleepy");
    let (controller, inspector) = components();

    let sampler = Sampler::new(Arc::clone(&controller), inspector)
        .with_settle_delay(Duration::from_millis(100))
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(5));

    let series = sampler
        .collect(
            &variant,
            MetricKind::MemoryMb,
            Duration::from_secs(1),
            Duration::from_millis(200),
        )
        .await;

    assert!(!series.is_empty(), "failures: {:?}", series.failures());
    assert!(series.len() <= 5);
    assert!(series.readings().iter().all(|mb| *mb > 0.0));
    assert!(!controller.is_running(&variant));
}
