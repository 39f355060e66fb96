//! Process termination primitives.
//!
//! Variants under test are killed outright: the harness measures cold
//! starts, so there is no graceful shutdown phase to wait for.

use shellbench_common::{ProcessError, ProcessResult};

/// Force kill a process (SIGKILL on Unix, TerminateProcess on Windows).
///
/// Returns `Ok(false)` if the process was already gone.
pub fn force_kill(pid: u32) -> ProcessResult<bool> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(ProcessError::stop_failed(pid.to_string(), e.to_string())),
        }
    }

    #[cfg(windows)]
    {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

        unsafe {
            // OpenProcess fails for PIDs that no longer exist.
            let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
                Ok(h) if !h.is_invalid() => h,
                _ => return Ok(false),
            };

            let result = TerminateProcess(handle, 1);
            let _ = CloseHandle(handle);

            result.map(|_| true).map_err(|e| {
                ProcessError::stop_failed(pid.to_string(), format!("TerminateProcess failed: {}", e))
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_force_kill_running_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();

        assert!(force_kill(child.id()).unwrap());
        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_force_kill_reaped_child_reports_gone() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        assert!(!force_kill(pid).unwrap());
    }
}
