//! ProcessController - launches variants and waits for them to come and go.
//!
//! The controller never tracks "its" process by PID for presence checks.
//! Applications under test commonly re-exec or fork helpers, so presence is
//! always decided by the variant's process pattern through the shared
//! [`ProcessInspector`].

use crate::inspector::ProcessInspector;
use crate::terminate::force_kill;
use crate::variant::AppVariant;
use async_trait::async_trait;
use parking_lot::Mutex;
use shellbench_common::{ProcessError, ProcessResult, VariantId};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Default interval between inspector polls while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Returned by a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchHandle {
    pub variant: VariantId,
    /// PID of the spawned child, if the OS reported one.
    pub pid: Option<u32>,
    pub launched_at: Instant,
}

/// Process lifecycle operations used by the timing harness, sampler and
/// resilience simulator.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Spawn the variant detached with output suppressed. Success only means
    /// the OS accepted the spawn.
    async fn launch(&self, variant: &AppVariant) -> ProcessResult<LaunchHandle>;

    /// Force kill every process matching the variant's pattern and return
    /// how many were killed. Terminating an absent variant is `Ok(0)`.
    async fn terminate(&self, variant: &AppVariant) -> ProcessResult<usize>;

    /// Poll until the variant is running. `false` on timeout.
    async fn await_presence(&self, variant: &AppVariant, timeout: Duration) -> bool;

    /// Poll until no process matches the variant. `false` on timeout.
    async fn await_absence(&self, variant: &AppVariant, timeout: Duration) -> bool;

    /// Single non-waiting presence check.
    fn is_running(&self, variant: &AppVariant) -> bool;
}

/// [`ProcessControl`] backed by real OS processes.
pub struct ProcessController {
    inspector: Arc<dyn ProcessInspector>,
    poll_interval: Duration,
    exit_monitors: Mutex<Vec<JoinHandle<()>>>,
}

impl ProcessController {
    pub fn new(inspector: Arc<dyn ProcessInspector>) -> Self {
        Self {
            inspector,
            poll_interval: DEFAULT_POLL_INTERVAL,
            exit_monitors: Mutex::new(Vec::new()),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn build_command(variant: &AppVariant) -> Command {
        let launch = &variant.launch;
        let mut cmd = Command::new(&launch.command);
        cmd.args(&launch.args);

        if let Some(ref wd) = launch.working_directory {
            cmd.current_dir(wd);
        }
        for (key, value) in &launch.environment {
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());

        // Detach from the harness so terminal signals aimed at the harness
        // do not reach the variant.
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }
        #[cfg(windows)]
        {
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
            const DETACHED_PROCESS: u32 = 0x00000008;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS);
        }

        cmd
    }

    /// Reap the child in the background so killed variants do not linger as
    /// zombies, and log how it exited.
    fn spawn_exit_monitor(&self, variant: VariantId, mut child: tokio::process::Child) {
        let pid = child.id().unwrap_or(0);
        let task = tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!("Variant {} (PID: {}) exited cleanly", variant, pid);
                }
                Ok(status) => {
                    debug!("Variant {} (PID: {}) exited with {:?}", variant, pid, status.code());
                }
                Err(e) => {
                    warn!("Failed to wait for variant {} (PID: {}): {}", variant, pid, e);
                }
            }
        });

        let mut monitors = self.exit_monitors.lock();
        monitors.retain(|handle| !handle.is_finished());
        monitors.push(task);
    }

    async fn wait_for(&self, variant: &AppVariant, timeout: Duration, present: bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.inspector.find_process(&variant.pattern) == present {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

#[async_trait]
impl ProcessControl for ProcessController {
    async fn launch(&self, variant: &AppVariant) -> ProcessResult<LaunchHandle> {
        let mut cmd = Self::build_command(variant);
        let launched_at = Instant::now();

        let child = cmd
            .spawn()
            .map_err(|e| ProcessError::spawn_failed(variant.id.as_str(), e.to_string()))?;
        let pid = child.id();

        info!(
            "Launched variant {} ({}) PID: {:?}",
            variant.id, variant.launch.command, pid
        );
        self.spawn_exit_monitor(variant.id.clone(), child);

        Ok(LaunchHandle {
            variant: variant.id.clone(),
            pid,
            launched_at,
        })
    }

    async fn terminate(&self, variant: &AppVariant) -> ProcessResult<usize> {
        let own_pid = std::process::id();
        let pids = self.inspector.matching_pids(&variant.pattern)?;

        let mut killed = 0;
        for pid in pids.into_iter().filter(|pid| *pid != own_pid) {
            match force_kill(pid) {
                Ok(true) => killed += 1,
                Ok(false) => debug!("PID {} of variant {} already gone", pid, variant.id),
                Err(e) => warn!("Failed to kill PID {} of variant {}: {}", pid, variant.id, e),
            }
        }

        if killed > 0 {
            info!("Terminated variant {} ({} process(es))", variant.id, killed);
        } else {
            debug!("Terminate {}: nothing running", variant.id);
        }
        Ok(killed)
    }

    async fn await_presence(&self, variant: &AppVariant, timeout: Duration) -> bool {
        let found = self.wait_for(variant, timeout, true).await;
        if !found {
            warn!("Variant {} did not appear within {:?}", variant.id, timeout);
        }
        found
    }

    async fn await_absence(&self, variant: &AppVariant, timeout: Duration) -> bool {
        let gone = self.wait_for(variant, timeout, false).await;
        if !gone {
            warn!("Variant {} still running after {:?}", variant.id, timeout);
        }
        gone
    }

    fn is_running(&self, variant: &AppVariant) -> bool {
        self.inspector.find_process(&variant.pattern)
    }
}

impl Drop for ProcessController {
    fn drop(&mut self) {
        for handle in self.exit_monitors.lock().drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::ProcessSnapshot;
    use crate::variant::{LaunchSpec, ProcessPattern};

    /// Inspector whose target is visible only inside a time window.
    struct WindowInspector {
        appears_at: Instant,
        disappears_at: Option<Instant>,
    }

    impl ProcessInspector for WindowInspector {
        fn name(&self) -> &'static str {
            "window"
        }

        fn snapshot(&self, _pattern: &ProcessPattern) -> ProcessResult<ProcessSnapshot> {
            let now = Instant::now();
            let visible =
                now >= self.appears_at && self.disappears_at.map_or(true, |t| now < t);
            let mut snapshot = ProcessSnapshot::default();
            if visible {
                snapshot.add(50.0, 1.0);
            }
            Ok(snapshot)
        }

        fn matching_pids(&self, _pattern: &ProcessPattern) -> ProcessResult<Vec<u32>> {
            Ok(Vec::new())
        }
    }

    fn variant(command: &str) -> AppVariant {
        AppVariant::new(
            "test",
            "Test",
            LaunchSpec::new(command),
            ProcessPattern::new("^shellbench-test$").unwrap(),
        )
    }

    fn controller(appears_in: Duration, disappears_in: Option<Duration>) -> ProcessController {
        let now = Instant::now();
        ProcessController::new(Arc::new(WindowInspector {
            appears_at: now + appears_in,
            disappears_at: disappears_in.map(|d| now + d),
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_presence_succeeds_when_process_appears() {
        let controller = controller(Duration::from_millis(350), None);
        let start = Instant::now();

        assert!(controller.await_presence(&variant("x"), Duration::from_secs(2)).await);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(350));
        assert!(waited <= Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_presence_times_out_without_error() {
        let controller = controller(Duration::from_secs(60), None);
        let start = Instant::now();

        assert!(!controller.await_presence(&variant("x"), Duration::from_millis(500)).await);
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_absence() {
        let controller = controller(Duration::ZERO, Some(Duration::from_millis(250)));
        let v = variant("x");

        assert!(controller.is_running(&v));
        assert!(controller.await_absence(&v, Duration::from_secs(1)).await);
        assert!(!controller.is_running(&v));
    }

    #[tokio::test]
    async fn test_terminate_absent_variant_is_idempotent() {
        let controller = controller(Duration::from_secs(3600), None);
        let v = variant("x");

        assert_eq!(controller.terminate(&v).await.unwrap(), 0);
        assert_eq!(controller.terminate(&v).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_launch_missing_binary_is_spawn_failure() {
        let controller = controller(Duration::ZERO, None);
        let result = controller
            .launch(&variant("/nonexistent/shellbench/missing-binary"))
            .await;

        assert!(matches!(result, Err(ProcessError::SpawnFailed { .. })));
    }
}
