//! Inspectors that shell out to the host's own process-listing command.
//!
//! - Unix: `ps -axo pid=,stat=,rss=,pcpu=,args=` for usage (RSS in KiB,
//!   per-core CPU percent) and `ps -axo pid=,comm=` for executable names
//! - Windows: PowerShell `Get-Process` as JSON (working set in bytes, CPU as
//!   total processor seconds)
//!
//! Both are normalised to MB and whole-machine CPU percent. Output that
//! cannot be parsed is reported as a query failure, which readers turn
//! into a dropped (zero) reading.

use crate::inspector::{
    file_name, logical_cpu_count, untruncated_name, ProcessInspector, ProcessSnapshot,
};
use crate::variant::ProcessPattern;
use parking_lot::Mutex;
use serde::Deserialize;
use shellbench_common::{ProcessError, ProcessResult};
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::trace;

/// One row of a process listing, already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    pub command_line: String,
    pub memory_mb: f64,
    /// Per-core CPU percent (Unix) or cumulative CPU seconds (Windows).
    pub cpu: f64,
    /// Exited but not yet reaped. Only `ps` reports this.
    pub zombie: bool,
}

fn run_listing(program: &str, args: &[&str]) -> ProcessResult<(u32, String)> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ProcessError::query_failed(program, e.to_string()))?;
    let listing_pid = child.id();

    let output = child
        .wait_with_output()
        .map_err(|e| ProcessError::query_failed(program, e.to_string()))?;
    if !output.status.success() {
        return Err(ProcessError::query_failed(
            program,
            format!("exited with {}", output.status),
        ));
    }
    Ok((listing_pid, String::from_utf8_lossy(&output.stdout).into_owned()))
}

fn row_matches(row: &ProcessRow, pattern: &ProcessPattern, skip_pids: &[u32]) -> bool {
    !row.zombie && !skip_pids.contains(&row.pid) && pattern.matches(&row.name, &row.command_line)
}

// =============================================================================
// Unix: ps
// =============================================================================

const PS_USAGE_FORMAT: &str = "pid=,stat=,rss=,pcpu=,args=";
const PS_NAME_FORMAT: &str = "pid=,comm=";

/// Parse one line of `ps -axo pid=,stat=,rss=,pcpu=,args=` output.
///
/// The name is a best guess from the first word of the command line; the
/// `comm` listing replaces it when available.
pub fn parse_ps_line(line: &str) -> Option<ProcessRow> {
    let mut fields = line.split_whitespace();
    let pid = fields.next()?.parse::<u32>().ok()?;
    let stat = fields.next()?;
    let rss_kb = fields.next()?.parse::<f64>().ok()?;
    let cpu = fields.next()?.replace(',', ".").parse::<f64>().ok()?;
    let command_line = fields.collect::<Vec<_>>().join(" ");
    let name = file_name(command_line.split_whitespace().next()?).to_string();

    Some(ProcessRow {
        pid,
        name,
        command_line,
        memory_mb: rss_kb / 1024.0,
        cpu,
        zombie: stat.starts_with('Z'),
    })
}

/// Parse one line of `ps -axo pid=,comm=` output. The name is everything
/// after the PID, spaces included.
pub fn parse_comm_line(line: &str) -> Option<(u32, &str)> {
    let (pid, comm) = line.trim().split_once(char::is_whitespace)?;
    let pid = pid.parse::<u32>().ok()?;
    let comm = comm.trim();
    if comm.is_empty() {
        return None;
    }
    Some((pid, comm))
}

/// Executable name from `comm`. macOS reports the full executable path;
/// Linux reports the bare name cut to 15 bytes.
fn ps_name<'a>(comm: &'a str, command_line: &'a str) -> &'a str {
    let name = if comm.starts_with('/') {
        file_name(comm)
    } else {
        comm
    };
    untruncated_name(name, command_line.split_whitespace().next())
}

/// Join a usage listing with a name listing. Zombies are dropped. Fails if
/// the usage listing has lines but none of them could be parsed.
pub fn parse_ps_output(usage: &str, names: &str) -> ProcessResult<Vec<ProcessRow>> {
    let lines: Vec<&str> = usage.lines().filter(|l| !l.trim().is_empty()).collect();
    let rows: Vec<ProcessRow> = lines.iter().filter_map(|l| parse_ps_line(l)).collect();

    if rows.is_empty() && !lines.is_empty() {
        return Err(ProcessError::query_failed("ps", "unparsable process listing"));
    }

    let comms: HashMap<u32, &str> = names.lines().filter_map(parse_comm_line).collect();
    Ok(rows
        .into_iter()
        .filter(|row| !row.zombie)
        .map(|mut row| {
            if let Some(comm) = comms.get(&row.pid) {
                let name = ps_name(comm, &row.command_line).to_string();
                row.name = name;
            }
            row
        })
        .collect())
}

/// Inspector that runs `ps` on every query.
pub struct PsInspector {
    cpu_count: f64,
}

impl PsInspector {
    pub fn new() -> Self {
        Self {
            cpu_count: logical_cpu_count(),
        }
    }

    fn matching_rows(&self, pattern: &ProcessPattern) -> ProcessResult<Vec<ProcessRow>> {
        let (names_pid, names) = run_listing("ps", &["-axo", PS_NAME_FORMAT])?;
        let (usage_pid, usage) = run_listing("ps", &["-axo", PS_USAGE_FORMAT])?;
        let skip = [names_pid, usage_pid, std::process::id()];
        Ok(parse_ps_output(&usage, &names)?
            .into_iter()
            .filter(|row| row_matches(row, pattern, &skip))
            .collect())
    }
}

impl Default for PsInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInspector for PsInspector {
    fn name(&self) -> &'static str {
        "ps"
    }

    fn snapshot(&self, pattern: &ProcessPattern) -> ProcessResult<ProcessSnapshot> {
        let mut snapshot = ProcessSnapshot::default();
        for row in self.matching_rows(pattern)? {
            snapshot.add(row.memory_mb, row.cpu / self.cpu_count);
        }
        trace!("ps snapshot for {}: {:?}", pattern, snapshot);
        Ok(snapshot)
    }

    fn matching_pids(&self, pattern: &ProcessPattern) -> ProcessResult<Vec<u32>> {
        Ok(self.matching_rows(pattern)?.iter().map(|r| r.pid).collect())
    }
}

// =============================================================================
// Windows: PowerShell Get-Process
// =============================================================================

// `-InputObject @(..)` keeps a single process serialised as an array.
const GET_PROCESS_SCRIPT: &str = "ConvertTo-Json -Compress -InputObject \
     @(Get-Process | Select-Object Id,ProcessName,WorkingSet64,CPU,Path)";

/// One element of the `Get-Process` JSON listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetProcessEntry {
    id: u32,
    process_name: String,
    working_set64: f64,
    /// Null for processes we cannot open.
    #[serde(rename = "CPU", default)]
    cpu: Option<f64>,
    #[serde(default)]
    path: Option<String>,
}

impl From<GetProcessEntry> for ProcessRow {
    fn from(entry: GetProcessEntry) -> Self {
        let command_line = entry
            .path
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| entry.process_name.clone());
        Self {
            pid: entry.id,
            name: entry.process_name,
            command_line,
            memory_mb: entry.working_set64 / 1024.0 / 1024.0,
            cpu: entry.cpu.unwrap_or(0.0),
            zombie: false,
        }
    }
}

/// Parse the `Get-Process` JSON listing. `cpu` on the returned rows holds
/// cumulative processor seconds.
pub fn parse_get_process_output(output: &str) -> ProcessResult<Vec<ProcessRow>> {
    let output = output.trim_start_matches('\u{feff}').trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<GetProcessEntry> = serde_json::from_str(output).map_err(|e| {
        ProcessError::query_failed("powershell", format!("unparsable process listing: {}", e))
    })?;
    Ok(entries.into_iter().map(ProcessRow::from).collect())
}

/// Turns cumulative CPU seconds into a percentage by differencing between
/// successive observations of the same PID.
#[derive(Debug, Default)]
pub struct CpuTimeTracker {
    last: HashMap<u32, (Instant, f64)>,
}

impl CpuTimeTracker {
    /// Record `cpu_seconds` for `pid` observed at `now` and return the
    /// whole-machine percentage since the previous observation (0 on the
    /// first one).
    pub fn observe(&mut self, pid: u32, cpu_seconds: f64, now: Instant, cpu_count: f64) -> f64 {
        let percent = match self.last.get(&pid) {
            Some((at, previous)) => {
                let wall = now.duration_since(*at).as_secs_f64();
                if wall > 0.0 && cpu_seconds >= *previous {
                    (cpu_seconds - previous) / wall / cpu_count * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last.insert(pid, (now, cpu_seconds));
        percent
    }

    /// Forget PIDs that were not seen in the latest listing.
    pub fn retain(&mut self, live: &[u32]) {
        self.last.retain(|pid, _| live.contains(pid));
    }
}

/// Inspector that runs PowerShell `Get-Process` on every query.
pub struct PowerShellInspector {
    cpu_count: f64,
    cpu_times: Mutex<CpuTimeTracker>,
}

impl PowerShellInspector {
    pub fn new() -> Self {
        Self {
            cpu_count: logical_cpu_count(),
            cpu_times: Mutex::new(CpuTimeTracker::default()),
        }
    }

    fn matching_rows(&self, pattern: &ProcessPattern) -> ProcessResult<Vec<ProcessRow>> {
        let (listing_pid, output) = run_listing(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", GET_PROCESS_SCRIPT],
        )?;
        let skip = [listing_pid, std::process::id()];
        Ok(parse_get_process_output(&output)?
            .into_iter()
            .filter(|row| row_matches(row, pattern, &skip))
            .collect())
    }
}

impl Default for PowerShellInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInspector for PowerShellInspector {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn snapshot(&self, pattern: &ProcessPattern) -> ProcessResult<ProcessSnapshot> {
        let rows = self.matching_rows(pattern)?;
        let now = Instant::now();
        let mut tracker = self.cpu_times.lock();
        let mut snapshot = ProcessSnapshot::default();

        for row in &rows {
            let cpu_percent = tracker.observe(row.pid, row.cpu, now, self.cpu_count);
            snapshot.add(row.memory_mb, cpu_percent);
        }
        let live: Vec<u32> = rows.iter().map(|r| r.pid).collect();
        tracker.retain(&live);

        trace!("powershell snapshot for {}: {:?}", pattern, snapshot);
        Ok(snapshot)
    }

    fn matching_pids(&self, pattern: &ProcessPattern) -> ProcessResult<Vec<u32>> {
        Ok(self.matching_rows(pattern)?.iter().map(|r| r.pid).collect())
    }
}
