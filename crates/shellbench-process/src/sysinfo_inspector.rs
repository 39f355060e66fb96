//! Process inspection through the `sysinfo` crate.

use crate::inspector::{cpu_count_of, untruncated_name, ProcessInspector, ProcessSnapshot};
use crate::variant::ProcessPattern;
use parking_lot::Mutex;
use shellbench_common::ProcessResult;
use std::path::Path;
use sysinfo::{
    CpuRefreshKind, Process, ProcessRefreshKind, ProcessStatus, RefreshKind, System, UpdateKind,
};
use tracing::trace;

/// Inspector backed by a shared `sysinfo::System`.
///
/// CPU usage in `sysinfo` is computed between two refreshes, so the first
/// reading for a freshly started process is zero. Samplers drop zero
/// readings, so this only costs one tick.
///
/// On Linux `Process::name` is the kernel's `comm`, cut to 15 bytes. Longer
/// names are recovered from the executable path or `argv[0]` before the
/// pattern is applied.
pub struct SysinfoInspector {
    system: Mutex<System>,
    cpu_count: f64,
}

impl SysinfoInspector {
    pub fn new() -> Self {
        let system =
            System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
        let cpu_count = cpu_count_of(&system);
        Self {
            system: Mutex::new(system),
            cpu_count,
        }
    }

    /// Refresh the process table and run `f` over every live matching process.
    fn with_matches<F>(&self, pattern: &ProcessPattern, mut f: F)
    where
        F: FnMut(&Process),
    {
        let mut system = self.system.lock();

        // Must specify what to refresh, otherwise sysinfo reports zeros.
        let refresh = ProcessRefreshKind::new()
            .with_memory()
            .with_cpu()
            .with_exe(UpdateKind::OnlyIfNotSet)
            .with_cmd(UpdateKind::OnlyIfNotSet);
        system.refresh_processes_specifics(refresh);

        let own_pid = std::process::id();
        for (pid, process) in system.processes() {
            if pid.as_u32() == own_pid || process.status() == ProcessStatus::Zombie {
                continue;
            }
            let command_line = if pattern.matches_command_line() {
                process.cmd().join(" ")
            } else {
                String::new()
            };
            let exe = process.exe().and_then(Path::to_str);
            let argv0 = process.cmd().first().map(String::as_str);
            let name = untruncated_name(process.name(), exe.into_iter().chain(argv0));
            if pattern.matches(name, &command_line) {
                f(process);
            }
        }
    }
}

impl Default for SysinfoInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInspector for SysinfoInspector {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    fn snapshot(&self, pattern: &ProcessPattern) -> ProcessResult<ProcessSnapshot> {
        let mut snapshot = ProcessSnapshot::default();
        let cpu_count = self.cpu_count;

        self.with_matches(pattern, |process| {
            let memory_mb = process.memory() as f64 / 1024.0 / 1024.0;
            let cpu_percent = process.cpu_usage() as f64 / cpu_count;
            snapshot.add(memory_mb, cpu_percent);
        });

        trace!(
            "sysinfo snapshot for {}: matches={} memory={:.1}MB cpu={:.2}%",
            pattern,
            snapshot.matches,
            snapshot.memory_mb,
            snapshot.cpu_percent
        );
        Ok(snapshot)
    }

    fn matching_pids(&self, pattern: &ProcessPattern) -> ProcessResult<Vec<u32>> {
        let mut pids = Vec::new();
        self.with_matches(pattern, |process| pids.push(process.pid().as_u32()));
        pids.sort_unstable();
        Ok(pids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_pattern_is_absent() {
        let inspector = SysinfoInspector::new();
        let pattern = ProcessPattern::new("^shellbench-no-such-process-[0-9]{12}$").unwrap();

        assert!(!inspector.find_process(&pattern));
        assert_eq!(inspector.read_memory_mb(&pattern), 0.0);
        assert!(inspector.matching_pids(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_own_process_is_never_matched() {
        let inspector = SysinfoInspector::new();
        let pattern = ProcessPattern::new(".*").unwrap();

        let pids = inspector.matching_pids(&pattern).unwrap();
        assert!(!pids.contains(&std::process::id()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_names_longer_than_comm_are_matched() {
        let name = format!("shellbench-long-name-{}", std::process::id());
        assert!(name.len() > 15);

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join(&name);
        let source = ["/bin/sleep", "/usr/bin/sleep"]
            .into_iter()
            .find(|p| Path::new(p).exists())
            .unwrap();
        std::fs::copy(source, &binary).unwrap();

        let mut child = std::process::Command::new(&binary).arg("30").spawn().unwrap();
        let pid = child.id();

        let inspector = SysinfoInspector::new();
        let pattern = ProcessPattern::new(&format!("^{}$", name)).unwrap();
        let pids = inspector.matching_pids(&pattern).unwrap();
        let snapshot = inspector.snapshot(&pattern).unwrap();

        child.kill().unwrap();
        child.wait().unwrap();

        assert_eq!(pids, vec![pid]);
        assert!(snapshot.memory_mb > 0.0);
    }
}
