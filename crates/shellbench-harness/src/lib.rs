//! # Shellbench Harness
//!
//! Orchestrates benchmark runs comparing two builds of an application:
//!
//! - [`TimingHarness`]: startup latency over repeated launches
//! - [`Sampler`]: memory and CPU polled over a fixed window
//! - [`BenchmarkHarness`]: `baseline`, `comparison` and `network-test` runs,
//!   each producing a [`ResultRecord`]
//!
//! Configuration is loaded from YAML ([`BenchmarkConfig`]) and validated
//! before any process is launched.

pub mod config;
pub mod context;
pub mod harness;
pub mod sampler;
pub mod timing;


pub use config::{BenchmarkConfig, ProbeConfig, VariantConfig};
pub use context::{ResultRecord, RunContext, RunMode};
pub use harness::BenchmarkHarness;
pub use sampler::Sampler;
pub use timing::{StartupPlan, TimingHarness};
