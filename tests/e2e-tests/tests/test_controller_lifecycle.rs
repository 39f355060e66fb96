//! Launch, detect, force kill and confirm absence of a real process.

#![cfg(target_os = "linux")]

use e2e_tests::SleepFixture;
use shellbench_process::{ProcessControl, ProcessController, ProcessInspector, SysinfoInspector};
use std::sync::Arc;
use std::time::Duration;

fn controller() -> ProcessController {
    let inspector: Arc<dyn ProcessInspector> = Arc::new(SysinfoInspector::new());
    ProcessController::new(inspector).with_poll_interval(Duration::from_millis(50))
}

#[tokio::test]
async fn test_launch_detect_and_terminate() {
    let fixture = SleepFixture::new("lc");
    let variant = fixture.variant("sleepy");
    let controller = controller();

    assert!(!controller.is_running(&variant));

    let handle = controller.launch(&variant).await.expect("launch");
    assert!(handle.pid.is_some());
    assert!(
        controller
            .await_presence(&variant, Duration::from_secs(5))
            .await,
        "{} never appeared",
        fixture.name()
    );
    assert!(controller.is_running(&variant));

    let killed = controller.terminate(&variant).await.expect("terminate");
    assert!(killed >= 1);
    assert!(
        controller
            .await_absence(&variant, Duration::from_secs(5))
            .await
    );

    // Terminating an absent variant is a no-op.
    assert_eq!(controller.terminate(&variant).await.expect("terminate"), 0);
    assert!(!controller.is_running(&variant));
}

#[tokio::test]
async fn test_presence_times_out_for_missing_binary() {
    let fixture = SleepFixture::new("mb");
    let mut variant = fixture.variant("ghost");
    variant.launch.command = fixture.dir().join("missing").to_string_lossy().into_owned();
    let controller = controller();

    assert!(controller.launch(&variant).await.is_err());
    assert!(
        !controller
            .await_presence(&variant, Duration::from_millis(300))
            .await
    );
}
