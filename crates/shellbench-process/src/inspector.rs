//! ProcessInspector - capability for querying the OS process table.
//!
//! One implementation is selected at startup (see [`create_inspector`]) and
//! shared by everything that needs to look at running processes. All
//! readings are normalised at this boundary:
//!
//! - memory is resident memory in MB, summed over every matching process
//! - CPU is a percentage of the whole machine (0-100), summed over every
//!   matching process
//!
//! A missing process is never an error: the convenience readers return
//! `0.0`, which callers treat as "no reading this tick".

use crate::native::{PowerShellInspector, PsInspector};
use crate::sysinfo_inspector::SysinfoInspector;
use crate::variant::ProcessPattern;
use serde::{Deserialize, Serialize};
use shellbench_common::{MetricKind, ProcessResult};
use std::sync::Arc;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tracing::debug;

/// Longest process name the Linux kernel keeps (`comm` is 16 bytes with the NUL).
pub(crate) const COMM_NAME_LIMIT: usize = 15;

/// Aggregated view of all processes matching a pattern at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessSnapshot {
    /// Number of matching processes.
    pub matches: usize,
    /// Resident memory in MB.
    pub memory_mb: f64,
    /// CPU usage in percent of the whole machine.
    pub cpu_percent: f64,
}

impl ProcessSnapshot {
    pub fn is_present(&self) -> bool {
        self.matches > 0
    }

    /// Reading for a sampled metric. Startup latency is not a snapshot
    /// metric and always reads as zero.
    pub fn reading(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::MemoryMb => self.memory_mb,
            MetricKind::CpuPercent => self.cpu_percent,
            MetricKind::StartupLatencyMs => 0.0,
        }
    }

    pub(crate) fn add(&mut self, memory_mb: f64, cpu_percent: f64) {
        self.matches += 1;
        self.memory_mb += memory_mb;
        self.cpu_percent += cpu_percent;
    }
}

/// Platform capability for finding processes and reading their usage.
pub trait ProcessInspector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Aggregate usage of all processes matching `pattern`.
    ///
    /// `Err` means the OS query itself failed or produced output that could
    /// not be parsed; an absent process is `Ok` with zero matches.
    fn snapshot(&self, pattern: &ProcessPattern) -> ProcessResult<ProcessSnapshot>;

    /// PIDs of all processes matching `pattern`.
    fn matching_pids(&self, pattern: &ProcessPattern) -> ProcessResult<Vec<u32>>;

    /// True if at least one process matches. Query failures read as absent.
    fn find_process(&self, pattern: &ProcessPattern) -> bool {
        self.snapshot(pattern)
            .map(|s| s.is_present())
            .unwrap_or_else(|e| {
                debug!("{} query failed for {}: {}", self.name(), pattern, e);
                false
            })
    }

    /// Memory in MB, or `0.0` when nothing matches or the query failed.
    fn read_memory_mb(&self, pattern: &ProcessPattern) -> f64 {
        self.read_metric(pattern, MetricKind::MemoryMb)
    }

    /// CPU percent, or `0.0` when nothing matches or the query failed.
    fn read_cpu_percent(&self, pattern: &ProcessPattern) -> f64 {
        self.read_metric(pattern, MetricKind::CpuPercent)
    }

    fn read_metric(&self, pattern: &ProcessPattern, kind: MetricKind) -> f64 {
        match self.snapshot(pattern) {
            Ok(snapshot) => snapshot.reading(kind),
            Err(e) => {
                debug!("{} query failed for {}: {}", self.name(), pattern, e);
                0.0
            }
        }
    }
}

/// Which inspector implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectorKind {
    /// Cross-platform process table access through `sysinfo`.
    #[default]
    Sysinfo,
    /// The host's own process-listing command (`ps` on Unix, PowerShell
    /// `Get-Process` on Windows).
    Native,
}

/// Create the inspector for this host.
pub fn create_inspector(kind: InspectorKind) -> Arc<dyn ProcessInspector> {
    match kind {
        InspectorKind::Sysinfo => Arc::new(SysinfoInspector::new()),
        InspectorKind::Native => {
            if cfg!(windows) {
                Arc::new(PowerShellInspector::new())
            } else {
                Arc::new(PsInspector::new())
            }
        }
    }
}

/// Number of logical CPUs, used to normalise per-core CPU percentages.
pub(crate) fn logical_cpu_count() -> f64 {
    let system =
        System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
    cpu_count_of(&system)
}

pub(crate) fn cpu_count_of(system: &System) -> f64 {
    system.cpus().len().max(1) as f64
}

/// Last component of a Unix or Windows path.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

/// The full executable name for a process whose reported `name` may have
/// been cut to [`COMM_NAME_LIMIT`] bytes.
///
/// `candidates` are paths the process is also known by (its executable,
/// `argv[0]`); the first one whose file name extends `name` wins.
pub(crate) fn untruncated_name<'a>(
    name: &'a str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> &'a str {
    if name.len() < COMM_NAME_LIMIT {
        return name;
    }
    candidates
        .into_iter()
        .map(file_name)
        .find(|full| full.len() > name.len() && full.starts_with(name))
        .unwrap_or(name)
}
