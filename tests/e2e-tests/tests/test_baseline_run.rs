//! Full baseline runs through the library and through the CLI.

#![cfg(target_os = "linux")]

use e2e_tests::{shellbench_path, SleepFixture};
use shellbench_common::{MetricKind, VariantId};
use shellbench_harness::{BenchmarkHarness, RunMode};
use std::fs;
use std::process::Command;

#[tokio::test]
async fn test_baseline_run_produces_summaries() {
    let fixture = SleepFixture::new("br");
    let harness = BenchmarkHarness::new(fixture.config("sleepy")).expect("harness");

    let record = harness
        .run(RunMode::Baseline, None)
        .await
        .expect("baseline run");

    let id = VariantId::from("sleepy");
    let results = &record.variant_results[&id];
    let startup = results[&MetricKind::StartupLatencyMs]
        .as_ref()
        .expect("startup summary");
    assert_eq!(startup.count, 2);
    assert!(startup.min <= startup.median && startup.median <= startup.max);
    assert!(results[&MetricKind::MemoryMb].is_some());
    assert!(!record.recommendations.is_empty());
    assert_eq!(record.mode, RunMode::Baseline);
}

#[tokio::test]
async fn test_preflight_refuses_running_variant() {
    let fixture = SleepFixture::new("pf");
    let mut child = Command::new(fixture.dir().join(fixture.name()))
        .arg("300")
        .spawn()
        .expect("spawn");

    // Give the process table a moment to show the child.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let harness = BenchmarkHarness::new(fixture.config("sleepy")).expect("harness");
    let result = harness.run(RunMode::Baseline, None).await;

    child.kill().ok();
    child.wait().ok();

    let err = result.expect_err("run should be refused");
    assert!(err.to_string().contains("sleepy"), "{}", err);
}

#[test]
fn test_cli_prints_result_record() {
    let Some(binary) = shellbench_path() else {
        println!("shellbench binary not built; skipping");
        return;
    };

    let fixture = SleepFixture::new("cl");
    let config_path = fixture.dir().join("bench.yaml");
    fs::write(&config_path, fixture.config_yaml("sleepy")).expect("write config");

    let output = Command::new(binary)
        .args(["--config", &config_path.to_string_lossy(), "--mode", "baseline"])
        .output()
        .expect("run shellbench");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let record: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON on stdout");
    assert_eq!(record["mode"], "baseline");
    assert!(record["variant_results"]["sleepy"]["startup_latency_ms"]["count"].is_number());
}
