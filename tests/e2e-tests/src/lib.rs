// E2E test support for shellbench
//
// The tests run a copy of the system `sleep` binary under a unique file name,
// so a name pattern matches only the processes a single test started.

pub mod fixture;

pub use fixture::SleepFixture;

use std::env;
use std::path::PathBuf;

/// Path to the `shellbench` binary next to the test executable, if it was built.
pub fn shellbench_path() -> Option<PathBuf> {
    let mut path = env::current_exe().ok()?.parent()?.to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }

    #[cfg(windows)]
    path.push("shellbench.exe");

    #[cfg(not(windows))]
    path.push("shellbench");

    path.exists().then_some(path)
}
