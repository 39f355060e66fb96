use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use shellbench_harness::{BenchmarkConfig, BenchmarkHarness, RunMode};

/// Shellbench - startup, memory, CPU and reconnection benchmarks for two
/// builds of the same application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: String,

    /// What to run
    #[arg(short, long, value_enum, default_value_t = Mode::Comparison)]
    mode: Mode,

    /// Variant to benchmark (overrides config for baseline and network-test)
    #[arg(long)]
    variant: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Baseline,
    Comparison,
    NetworkTest,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Baseline => RunMode::Baseline,
            Mode::Comparison => RunMode::Comparison,
            Mode::NetworkTest => RunMode::NetworkTest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = BenchmarkConfig::load_from_file(&args.config)?;

    let level = if args.debug {
        "debug"
    } else {
        config.harness.log_level.as_str()
    };
    initialize_logging(level)?;

    info!("Config file: {}", args.config);
    info!("Loaded configuration for {} variants", config.variants.len());

    let harness = BenchmarkHarness::new(config)?;
    let mode = RunMode::from(args.mode);

    let record = tokio::select! {
        result = harness.run(mode, args.variant.as_deref()) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; terminating variants");
            harness.terminate_all().await;
            anyhow::bail!("Benchmark interrupted");
        }
    };

    let json = serde_json::to_string_pretty(&record).context("Failed to serialize result record")?;
    println!("{}", json);

    info!("{} run finished", mode);
    Ok(())
}

fn initialize_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    Ok(())
}
