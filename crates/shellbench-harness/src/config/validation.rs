use super::*;
use anyhow::{anyhow, Context, Result};
use shellbench_process::{validate_launch_spec, validate_variant_id};
use std::collections::HashSet;
use tracing::info;

/// Validate the complete configuration
pub fn validate_config(config: &BenchmarkConfig) -> Result<()> {
    validate_harness_options(&config.harness)?;
    validate_variant_configs(&config.variants)?;
    validate_variant_references(config)?;
    validate_startup_options(&config.startup)?;
    validate_sampling_options(&config.sampling)?;
    validate_network_options(&config.network)?;
    validate_thresholds(&config.thresholds)?;

    Ok(())
}

fn validate_harness_options(options: &HarnessOptions) -> Result<()> {
    if options.poll_interval.is_zero() {
        return Err(anyhow!("Poll interval must be greater than 0"));
    }

    match options.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(anyhow!(
            "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
            options.log_level
        )),
    }
}

fn validate_variant_configs(variants: &[VariantConfig]) -> Result<()> {
    if variants.is_empty() {
        return Err(anyhow!("At least one variant must be configured"));
    }

    let mut ids = HashSet::new();
    for variant in variants {
        if !ids.insert(&variant.id) {
            return Err(anyhow!("Duplicate variant ID: {}", variant.id));
        }
        if variant.id.len() > 64 {
            return Err(anyhow!("Variant ID too long (max 64 characters): {}", variant.id));
        }

        validate_variant_id(&variant.id)?;
        validate_launch_spec(&variant.id, &variant.launch)?;
        variant
            .to_variant()
            .with_context(|| format!("Invalid process pattern for variant {}", variant.id))?;
    }

    Ok(())
}

fn require_variant(config: &BenchmarkConfig, role: &str, id: Option<&String>) -> Result<()> {
    match id {
        Some(id) if config.variant_config(id).is_none() => {
            Err(anyhow!("{} variant '{}' is not defined", role, id))
        }
        _ => Ok(()),
    }
}

fn validate_variant_references(config: &BenchmarkConfig) -> Result<()> {
    require_variant(config, "Baseline", config.baseline.as_ref())?;
    require_variant(config, "Candidate", config.candidate.as_ref())?;
    require_variant(config, "Network test", config.network.variant.as_ref())?;

    if let (Some(baseline), Some(candidate)) = (&config.baseline, &config.candidate) {
        if baseline == candidate {
            return Err(anyhow!("Baseline and candidate must be different variants: {}", baseline));
        }

        let (b, c) = (
            config.variant_config(baseline),
            config.variant_config(candidate),
        );
        if let (Some(b), Some(c)) = (b, c) {
            if b.process_pattern == c.process_pattern && b.match_command_line == c.match_command_line {
                info!(
                    "Variants {} and {} share process pattern {}; they will be benchmarked strictly one after the other",
                    baseline, candidate, b.process_pattern
                );
            }
        }
    }

    Ok(())
}

fn validate_startup_options(options: &StartupOptions) -> Result<()> {
    if options.iterations == 0 {
        return Err(anyhow!("Startup iterations must be greater than 0"));
    }
    if options.presence_timeout.is_zero() {
        return Err(anyhow!("Presence timeout must be greater than 0"));
    }
    if options.absence_timeout.is_zero() {
        return Err(anyhow!("Absence timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_sampling_options(options: &SamplingOptions) -> Result<()> {
    if options.duration.is_zero() {
        return Err(anyhow!("Sampling duration must be greater than 0"));
    }
    if options.interval.is_zero() {
        return Err(anyhow!("Sampling interval must be greater than 0"));
    }
    if options.interval > options.duration {
        return Err(anyhow!(
            "Sampling interval ({:?}) cannot exceed sampling duration ({:?})",
            options.interval,
            options.duration
        ));
    }

    Ok(())
}

fn validate_network_options(options: &NetworkOptions) -> Result<()> {
    if options.outage_window.is_zero() {
        return Err(anyhow!("Outage window must be greater than 0"));
    }
    if options.probe_interval.is_zero() {
        return Err(anyhow!("Probe interval must be greater than 0"));
    }
    if options.retry_interval.is_zero() {
        return Err(anyhow!("Retry interval must be greater than 0"));
    }

    if let Some(ref probe) = options.probe {
        validate_probe_config(probe)?;
    }

    Ok(())
}

fn validate_probe_config(probe: &ProbeConfig) -> Result<()> {
    if probe.timeout().is_zero() {
        return Err(anyhow!("Probe timeout must be greater than 0"));
    }

    match probe {
        ProbeConfig::Tcp { address, .. } => {
            if !address.contains(':') {
                return Err(anyhow!("TCP probe address must be host:port, got: {}", address));
            }
        }
        ProbeConfig::Http {
            endpoint,
            expected_status,
            ..
        } => {
            if !endpoint.starts_with("http://") {
                return Err(anyhow!("HTTP probe endpoint must be an http:// URL, got: {}", endpoint));
            }
            if expected_status.is_empty() {
                return Err(anyhow!("HTTP probe needs at least one expected status"));
            }
        }
    }

    Ok(())
}

fn validate_thresholds(thresholds: &Thresholds) -> Result<()> {
    for (name, value) in [
        ("startup_ms", thresholds.startup_ms),
        ("memory_mb", thresholds.memory_mb),
        ("cpu_percent", thresholds.cpu_percent),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(anyhow!("Threshold {} must be a positive number, got: {}", name, value));
        }
    }

    Ok(())
}
