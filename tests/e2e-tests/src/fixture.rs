use shellbench_harness::{BenchmarkConfig, VariantConfig};
use shellbench_process::{AppVariant, LaunchSpec, ProcessPattern};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SLEEP_CANDIDATES: [&str; 2] = ["/bin/sleep", "/usr/bin/sleep"];

/// A uniquely named copy of `sleep` in a temporary directory.
pub struct SleepFixture {
    dir: TempDir,
    name: String,
    binary: PathBuf,
}

impl SleepFixture {
    /// `tag` keeps fixtures of different tests apart. The name stays within
    /// the 15 bytes Linux keeps as a process name.
    pub fn new(tag: &str) -> Self {
        Self::named(format!("sb{}{}", tag, std::process::id()))
    }

    /// A fixture with an exact executable name, of any length.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let source = SLEEP_CANDIDATES
            .into_iter()
            .find(|p| Path::new(p).exists())
            .expect("no sleep binary found");

        let dir = TempDir::new().expect("Failed to create test directory");
        let binary = dir.path().join(&name);
        fs::copy(source, &binary).expect("Failed to copy sleep binary");

        Self { dir, name, binary }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn pattern(&self) -> String {
        format!("^{}$", self.name)
    }

    pub fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec::new(self.binary.to_string_lossy()).with_args(["300"])
    }

    pub fn variant(&self, id: &str) -> AppVariant {
        let pattern = ProcessPattern::new(&self.pattern()).expect("valid pattern");
        AppVariant::new(id, self.name.clone(), self.launch_spec(), pattern)
    }

    pub fn variant_config(&self, id: &str) -> VariantConfig {
        VariantConfig::new(id, self.launch_spec(), self.pattern())
    }

    /// A small, fast baseline config for this fixture.
    pub fn config_yaml(&self, id: &str) -> String {
        format!(
            r#"
harness:
  poll_interval: 50ms
variants:
  - id: {id}
    launch:
      command: {command}
      args: ["300"]
    process_pattern: "{pattern}"
baseline: {id}
startup:
  iterations: 2
  settle_delay: 100ms
  presence_timeout: 5s
  absence_timeout: 5s
  inter_iteration_delay: 100ms
sampling:
  duration: 1s
  interval: 200ms
  settle_delay: 100ms
"#,
            id = id,
            command = self.binary.display(),
            pattern = self.pattern(),
        )
    }

    pub fn config(&self, id: &str) -> BenchmarkConfig {
        BenchmarkConfig::load_from_string(&self.config_yaml(id)).expect("valid config")
    }
}
