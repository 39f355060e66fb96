//! The `ps`-backed inspector driving the controller against real processes,
//! and executable names longer than the kernel's 15-byte process name.

#![cfg(target_os = "linux")]

use e2e_tests::SleepFixture;
use shellbench_process::{
    create_inspector, InspectorKind, ProcessControl, ProcessController, ProcessInspector,
};
use std::sync::Arc;
use std::time::Duration;

fn controller(inspector: Arc<dyn ProcessInspector>) -> ProcessController {
    ProcessController::new(inspector).with_poll_interval(Duration::from_millis(50))
}

#[tokio::test]
async fn test_native_inspector_lifecycle() {
    let fixture = SleepFixture::new("ni");
    let variant = fixture.variant("sleepy");
    let inspector = create_inspector(InspectorKind::Native);
    assert_eq!(inspector.name(), "ps");
    let controller = controller(Arc::clone(&inspector));

    assert!(!controller.is_running(&variant));

    controller.launch(&variant).await.expect("launch");
    assert!(
        controller
            .await_presence(&variant, Duration::from_secs(5))
            .await,
        "{} never appeared in ps",
        fixture.name()
    );

    let snapshot = inspector.snapshot(&variant.pattern).expect("ps listing");
    assert_eq!(snapshot.matches, 1);
    assert!(snapshot.memory_mb > 0.0);

    assert!(controller.terminate(&variant).await.expect("terminate") >= 1);
    assert!(
        controller
            .await_absence(&variant, Duration::from_secs(5))
            .await
    );
    assert_eq!(controller.terminate(&variant).await.expect("terminate"), 0);
}

#[tokio::test]
async fn test_long_executable_names_are_found_by_both_inspectors() {
    let fixture = SleepFixture::named(format!("shellbench-long-name-{}", std::process::id()));
    assert!(fixture.name().len() > 15);
    let variant = fixture.variant("long");

    for kind in [InspectorKind::Sysinfo, InspectorKind::Native] {
        let controller = controller(create_inspector(kind));

        controller.launch(&variant).await.expect("launch");
        assert!(
            controller
                .await_presence(&variant, Duration::from_secs(5))
                .await,
            "{:?} inspector did not find {}",
            kind,
            fixture.name()
        );

        assert!(controller.terminate(&variant).await.expect("terminate") >= 1);
        assert!(
            controller
                .await_absence(&variant, Duration::from_secs(5))
                .await
        );
    }
}
