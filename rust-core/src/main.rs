//! `vibespec` - averaged vibration spectra from a logged CSV export

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use vibespec::pipeline::{analyze, RunConfig, StopReason};
use vibespec::report::{write_report, ReportFormat};
use vibespec::store::CsvStore;

#[derive(Parser, Debug)]
#[command(name = "vibespec")]
#[command(about = "Streaming averaged amplitude spectra and periodograms of sensor logs")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML run configuration
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override analysis.max_iterations
    #[arg(long, value_name = "M")]
    max_iterations: Option<usize>,

    /// Override output.directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Override output.format (csv or json)
    #[arg(long)]
    format: Option<ReportFormat>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("loading run config {}", args.config.display()))?;
    if let Some(max_iterations) = args.max_iterations {
        config.analysis.max_iterations = max_iterations;
    }
    if let Some(output) = args.output {
        config.output.directory = output;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    config.validate().context("invalid command-line override")?;

    let store = CsvStore::new(&config.source.path).with_batch_rows(config.source.batch_rows);
    let outcome = analyze(&store, &config.query(), &config.analysis)
        .with_context(|| format!("analysing {}", config.source.path.display()))?;

    let summary = &outcome.summary;
    match summary.stop_reason {
        StopReason::EndOfStream => info!("Upstream exhausted on a window boundary"),
        StopReason::PartialWindow { rows } => {
            info!(rows, "Stopped at partial window; trailing rows excluded")
        }
        StopReason::IterationCap => info!(
            max_iterations = config.analysis.max_iterations,
            "Stopped at iteration cap"
        ),
    }

    for ch in &outcome.channels {
        match ch.magnitude.as_ref().and_then(|s| s.peak()) {
            Some((freq, amp)) => info!(channel = %ch.channel, peak_hz = freq, amplitude = amp, "Dominant component"),
            None => warn!(channel = %ch.channel, "No spectrum produced"),
        }
    }

    let files = write_report(&config.output.directory, config.output.format, &outcome)
        .with_context(|| format!("writing report to {}", config.output.directory.display()))?;

    info!(
        windows = summary.windows_processed,
        rows = summary.rows_processed,
        files = files.len(),
        "Run complete"
    );
    Ok(())
}
