use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shellbench_common::ProcessResult;
use shellbench_process::{AppVariant, InspectorKind, LaunchSpec, ProcessPattern};
use shellbench_resilience::{ConnectivityProbe, HttpProbe, OutageSettings, TcpProbe};
use shellbench_stats::Thresholds;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub mod validation;

/// Top-level benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default)]
    pub harness: HarnessOptions,
    pub variants: Vec<VariantConfig>,
    /// Variant measured in baseline mode and used as the reference in comparisons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(default)]
    pub startup: StartupOptions,
    #[serde(default)]
    pub sampling: SamplingOptions,
    #[serde(default)]
    pub network: NetworkOptions,
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Harness-wide options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessOptions {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub inspector: InspectorKind,
    /// Interval between process-table polls while waiting for presence/absence
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,
}

/// One application variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub launch: LaunchSpec,
    /// Regex matched against the process name (or command line, see below)
    pub process_pattern: String,
    #[serde(default)]
    pub match_command_line: bool,
}

/// Startup latency measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupOptions {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Run one launch/terminate cycle before measuring
    #[serde(default)]
    pub warm: bool,
    #[serde(default = "default_startup_settle_delay", with = "duration_serde")]
    pub settle_delay: Duration,
    #[serde(default = "default_presence_timeout", with = "duration_serde")]
    pub presence_timeout: Duration,
    #[serde(default = "default_absence_timeout", with = "duration_serde")]
    pub absence_timeout: Duration,
    #[serde(default = "default_inter_iteration_delay", with = "duration_serde")]
    pub inter_iteration_delay: Duration,
}

/// Memory/CPU sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingOptions {
    #[serde(default = "default_sampling_duration", with = "duration_serde")]
    pub duration: Duration,
    #[serde(default = "default_sampling_interval", with = "duration_serde")]
    pub interval: Duration,
    #[serde(default = "default_sampling_settle_delay", with = "duration_serde")]
    pub settle_delay: Duration,
}

/// Network outage observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default = "default_outage_window", with = "duration_serde")]
    pub outage_window: Duration,
    #[serde(default = "default_probe_interval", with = "duration_serde")]
    pub probe_interval: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_interval", with = "duration_serde")]
    pub retry_interval: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeConfig>,
}

/// Connectivity probe (tagged by `type`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeConfig {
    Tcp {
        /// `host:port`
        address: String,
        #[serde(default = "default_probe_timeout", with = "duration_serde")]
        timeout: Duration,
    },
    Http {
        endpoint: String,
        #[serde(default = "default_probe_timeout", with = "duration_serde")]
        timeout: Duration,
        #[serde(default = "default_expected_status")]
        expected_status: Vec<u16>,
    },
}

impl BenchmarkConfig {
    /// A config with every section at its defaults.
    pub fn new(variants: Vec<VariantConfig>) -> Self {
        Self {
            harness: HarnessOptions::default(),
            variants,
            baseline: None,
            candidate: None,
            startup: StartupOptions::default(),
            sampling: SamplingOptions::default(),
            network: NetworkOptions::default(),
            thresholds: Thresholds::default(),
        }
    }

    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: BenchmarkConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    pub fn variant_config(&self, id: &str) -> Option<&VariantConfig> {
        self.variants.iter().find(|v| v.id == id)
    }
}

impl VariantConfig {
    pub fn new(id: impl Into<String>, launch: LaunchSpec, process_pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            launch,
            process_pattern: process_pattern.into(),
            match_command_line: false,
        }
    }

    /// Compile into an immutable [`AppVariant`].
    pub fn to_variant(&self) -> ProcessResult<AppVariant> {
        let pattern =
            ProcessPattern::new(&self.process_pattern)?.with_command_line(self.match_command_line);
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        Ok(AppVariant::new(self.id.as_str(), name, self.launch.clone(), pattern))
    }
}

impl NetworkOptions {
    pub fn outage_settings(&self, startup: &StartupOptions) -> OutageSettings {
        OutageSettings {
            outage_window: self.outage_window,
            probe_interval: self.probe_interval,
            max_retries: self.max_retries,
            retry_interval: self.retry_interval,
            presence_timeout: startup.presence_timeout,
            absence_timeout: startup.absence_timeout,
        }
    }
}

impl ProbeConfig {
    pub fn build(&self) -> Arc<dyn ConnectivityProbe> {
        match self {
            ProbeConfig::Tcp { address, timeout } => Arc::new(TcpProbe::new(address.clone(), *timeout)),
            ProbeConfig::Http {
                endpoint,
                timeout,
                expected_status,
            } => Arc::new(
                HttpProbe::new(endpoint.clone(), *timeout)
                    .with_expected_status(expected_status.clone()),
            ),
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            ProbeConfig::Tcp { timeout, .. } | ProbeConfig::Http { timeout, .. } => *timeout,
        }
    }
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            inspector: InspectorKind::default(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            warm: false,
            settle_delay: default_startup_settle_delay(),
            presence_timeout: default_presence_timeout(),
            absence_timeout: default_absence_timeout(),
            inter_iteration_delay: default_inter_iteration_delay(),
        }
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            duration: default_sampling_duration(),
            interval: default_sampling_interval(),
            settle_delay: default_sampling_settle_delay(),
        }
    }
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            variant: None,
            outage_window: default_outage_window(),
            probe_interval: default_probe_interval(),
            max_retries: default_max_retries(),
            retry_interval: default_retry_interval(),
            probe: None,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_iterations() -> u32 {
    5
}

fn default_startup_settle_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_presence_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_absence_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_inter_iteration_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_sampling_duration() -> Duration {
    Duration::from_secs(10)
}

fn default_sampling_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_sampling_settle_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_outage_window() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_expected_status() -> Vec<u16> {
    vec![200]
}

// Durations are written as "250ms", "2s" or "1m"
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(s.trim()).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let invalid = || format!("Invalid duration: {}", s);

        // "ms" before "s"
        if let Some(num) = s.strip_suffix("ms") {
            num.trim().parse().map(Duration::from_millis).map_err(|_| invalid())
        } else if let Some(num) = s.strip_suffix('s') {
            num.trim().parse().map(Duration::from_secs).map_err(|_| invalid())
        } else if let Some(num) = s.strip_suffix('m') {
            num.trim()
                .parse::<u64>()
                .map(|mins| Duration::from_secs(mins * 60))
                .map_err(|_| invalid())
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
