//! BenchmarkHarness - one entry point per run mode.
//!
//! Variants are always benchmarked strictly one after another, and every
//! run starts with an exclusivity check: if any configured variant is
//! already running, measurements would be attributed to the wrong process,
//! so the run is refused before anything is launched.

use crate::config::BenchmarkConfig;
use crate::context::{ResultRecord, RunContext, RunMode};
use crate::sampler::Sampler;
use crate::timing::{StartupPlan, TimingHarness};
use shellbench_common::{Error, MetricKind, Result, VariantId};
use shellbench_process::{
    create_inspector, AppVariant, ProcessControl, ProcessController, ProcessInspector,
};
use shellbench_resilience::{ConnectivityProbe, OutageState, ResilienceSimulator};
use shellbench_stats::{recommend, ComparisonResult, MetricSummaries};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BenchmarkHarness {
    config: BenchmarkConfig,
    variants: Vec<AppVariant>,
    controller: Arc<dyn ProcessControl>,
    inspector: Arc<dyn ProcessInspector>,
    probe_override: Option<Arc<dyn ConnectivityProbe>>,
}

impl BenchmarkHarness {
    /// Build a harness that drives real processes.
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        let inspector = create_inspector(config.harness.inspector);
        info!("Using {} process inspector", inspector.name());
        let controller = Arc::new(
            ProcessController::new(Arc::clone(&inspector))
                .with_poll_interval(config.harness.poll_interval),
        );
        Self::with_components(config, controller, inspector)
    }

    /// Build a harness on top of explicit process components.
    pub fn with_components(
        config: BenchmarkConfig,
        controller: Arc<dyn ProcessControl>,
        inspector: Arc<dyn ProcessInspector>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::configuration(format!("{:#}", e)))?;

        let variants = config
            .variants
            .iter()
            .map(|v| v.to_variant().map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            variants,
            controller,
            inspector,
            probe_override: None,
        })
    }

    /// Use this probe for network tests instead of the configured one.
    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe_override = Some(probe);
        self
    }

    pub fn variant(&self, id: &str) -> Result<&AppVariant> {
        self.variants
            .iter()
            .find(|v| v.id.as_str() == id)
            .ok_or_else(|| Error::configuration(format!("Variant '{}' is not defined", id)))
    }

    /// Run the given mode. `variant` overrides the configured variant for
    /// baseline and network-test runs.
    pub async fn run(&self, mode: RunMode, variant: Option<&str>) -> Result<ResultRecord> {
        match mode {
            RunMode::Baseline => self.run_baseline(variant).await,
            RunMode::Comparison => self.run_comparison().await,
            RunMode::NetworkTest => self.run_network_test(variant).await,
        }
    }

    /// Benchmark a single variant.
    pub async fn run_baseline(&self, variant: Option<&str>) -> Result<ResultRecord> {
        let id = variant
            .map(str::to_string)
            .or_else(|| self.config.baseline.clone())
            .ok_or_else(|| Error::configuration("No baseline variant configured"))?;
        let variant = self.variant(&id)?;

        self.preflight()?;
        info!("Starting baseline run for {}", variant.id);

        let mut ctx = RunContext::new(RunMode::Baseline);
        self.benchmark_variant(variant, &mut ctx).await;

        if let Some(summaries) = ctx.summaries(&variant.id) {
            let recommendations = recommend(summaries, &self.config.thresholds);
            ctx.set_recommendations(recommendations);
        }
        Ok(ctx.into_record())
    }

    /// Benchmark the baseline, then the candidate, and compare them.
    pub async fn run_comparison(&self) -> Result<ResultRecord> {
        let baseline_id = self
            .config
            .baseline
            .as_deref()
            .ok_or_else(|| Error::configuration("Comparison requires a baseline variant"))?;
        let candidate_id = self
            .config
            .candidate
            .as_deref()
            .ok_or_else(|| Error::configuration("Comparison requires a candidate variant"))?;
        let baseline = self.variant(baseline_id)?;
        let candidate = self.variant(candidate_id)?;

        self.preflight()?;
        if baseline.shares_pattern_with(candidate) {
            info!(
                "{} and {} share process pattern {}; running sequentially",
                baseline.id, candidate.id, baseline.pattern
            );
        }
        info!("Starting comparison run: {} vs {}", baseline.id, candidate.id);

        let mut ctx = RunContext::new(RunMode::Comparison);
        self.benchmark_variant(baseline, &mut ctx).await;
        self.benchmark_variant(candidate, &mut ctx).await;

        let empty = MetricSummaries::default();
        let baseline_stats = ctx.summaries(&baseline.id).unwrap_or(&empty);
        let candidate_stats = ctx.summaries(&candidate.id).unwrap_or(&empty);

        let comparison =
            ComparisonResult::build(&baseline.id, baseline_stats, &candidate.id, candidate_stats);
        let recommendations = recommend(candidate_stats, &self.config.thresholds);

        for (kind, improvement) in &comparison.metrics {
            info!(
                "{}: {:.1}% improvement ({:+.2} absolute)",
                kind, improvement.percentage, improvement.absolute
            );
        }

        ctx.set_comparison(comparison);
        ctx.set_recommendations(recommendations);
        Ok(ctx.into_record())
    }

    /// Observe one variant through an outage window.
    pub async fn run_network_test(&self, variant: Option<&str>) -> Result<ResultRecord> {
        let id = variant
            .map(str::to_string)
            .or_else(|| self.config.network.variant.clone())
            .or_else(|| self.config.candidate.clone())
            .or_else(|| self.config.baseline.clone())
            .ok_or_else(|| Error::configuration("No variant configured for the network test"))?;
        let variant = self.variant(&id)?;

        let probe = match (&self.probe_override, &self.config.network.probe) {
            (Some(probe), _) => Arc::clone(probe),
            (None, Some(config)) => config.build(),
            (None, None) => {
                return Err(Error::configuration(
                    "Network test requires a probe (network.probe)",
                ))
            }
        };

        self.preflight()?;
        info!("Starting network test for {} via {}", variant.id, probe.describe());

        let settings = self.config.network.outage_settings(&self.config.startup);
        let simulator = ResilienceSimulator::new(Arc::clone(&self.controller), probe, settings);
        let report = simulator.run(variant).await?;

        let mut ctx = RunContext::new(RunMode::NetworkTest);
        let recommendation = match (report.state, report.reconnection_time_ms) {
            (OutageState::Reconnected, Some(ms)) => {
                format!("{} reconnected {}ms into the outage window", variant.id, ms)
            }
            (OutageState::TimedOut, _) => format!(
                "{} did not reconnect within {}ms",
                variant.id, report.outage_window_ms
            ),
            _ => format!("{}: N/A (simulation did not start)", variant.id),
        };
        ctx.set_recommendations(vec![recommendation]);
        ctx.set_network(report);
        Ok(ctx.into_record())
    }

    /// Kill every configured variant. Used when a run is interrupted.
    pub async fn terminate_all(&self) {
        for variant in &self.variants {
            if let Err(e) = self.controller.terminate(variant).await {
                warn!("Failed to terminate {}: {}", variant.id, e);
            }
        }
    }

    /// Refuse to run while any configured variant is already running.
    fn preflight(&self) -> Result<()> {
        let running: Vec<&VariantId> = self
            .variants
            .iter()
            .filter(|v| self.controller.is_running(v))
            .map(|v| &v.id)
            .collect();

        if running.is_empty() {
            return Ok(());
        }

        let ids: Vec<&str> = running.iter().map(|id| id.as_str()).collect();
        Err(Error::precondition(format!(
            "Variant(s) already running before the run started: {}. Close them and retry",
            ids.join(", ")
        )))
    }

    async fn benchmark_variant(&self, variant: &AppVariant, ctx: &mut RunContext) {
        let startup = &self.config.startup;
        let timing = TimingHarness::new(
            Arc::clone(&self.controller),
            StartupPlan {
                iterations: startup.iterations,
                warm: startup.warm,
                settle_delay: startup.settle_delay,
                presence_timeout: startup.presence_timeout,
                absence_timeout: startup.absence_timeout,
                inter_iteration_delay: startup.inter_iteration_delay,
            },
        );
        let series = timing.measure_startup(variant).await;
        if series.is_empty() {
            warn!("No successful startups for {}", variant.id);
        }
        ctx.record_series(&variant.id, series);

        let sampling = &self.config.sampling;
        let kinds: Vec<MetricKind> = MetricKind::ALL
            .into_iter()
            .filter(MetricKind::is_resource)
            .collect();
        let sampler = Sampler::new(Arc::clone(&self.controller), Arc::clone(&self.inspector))
            .with_settle_delay(sampling.settle_delay)
            .with_timeouts(startup.presence_timeout, startup.absence_timeout);
        for series in sampler
            .collect_all(variant, &kinds, sampling.duration, sampling.interval)
            .await
        {
            ctx.record_series(&variant.id, series);
        }
    }
}
