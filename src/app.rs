use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::analysis::smoothing::MAX_INTENSITY;
use crate::analysis::ProcessingSettings;
use crate::state::AnalysisSession;
use crate::ui::{json, report};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Inspect metric logs from one or more hosts: smoothed traces,
/// derivatives, statistics and point-in-time snapshots.
#[derive(Debug, Parser)]
#[command(name = "telemetry-lens", version, about)]
pub struct Cli {
    /// Log files with Timestamp, Metric and Value columns (.csv, .json, .parquet)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Metric to analyse; repeat for several. Defaults to the first metric in the catalog.
    #[arg(short, long = "metric", value_name = "NAME")]
    pub metrics: Vec<String>,

    /// Median smoothing intensity, 0 disables smoothing
    #[arg(
        short,
        long,
        env = "TELEMETRY_LENS_SMOOTHING",
        default_value_t = ProcessingSettings::default().smoothing,
        value_parser = clap::value_parser!(u8).range(0..=MAX_INTENSITY as i64)
    )]
    pub smoothing: u8,

    /// Keep the first five seconds of each series when differentiating
    #[arg(long, env = "TELEMETRY_LENS_KEEP_TRANSIENT")]
    pub keep_transient: bool,

    /// Print values nearest to this offset (seconds from each file's first record)
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub snapshot: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Include every processed sample in JSON output
    #[arg(long)]
    pub series: bool,

    /// Print the metric catalog and exit
    #[arg(long)]
    pub list_metrics: bool,
}

impl Cli {
    pub fn settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            smoothing: self.smoothing,
            ignore_initial_transient: !self.keep_transient,
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Load every file, process the selection and print the report.
///
/// Files that fail to load are reported and skipped.
pub fn run(cli: Cli) -> Result<()> {
    let mut session = AnalysisSession::new(cli.settings());
    let mut failures = 0usize;

    for path in &cli.files {
        match session.load_path(path) {
            Ok(message) => eprintln!("{message}"),
            Err(e) => {
                log::warn!("Failed to load {}: {e}", path.display());
                eprintln!("Error: {e}");
                failures += 1;
            }
        }
    }

    if session.store.is_empty() {
        anyhow::bail!("none of the {} input file(s) could be loaded", cli.files.len());
    }
    if failures > 0 {
        log::info!("{failures} file(s) skipped");
    }

    if cli.list_metrics {
        print!("{}", report::render_catalog(&session.metrics()));
        return Ok(());
    }

    if !cli.metrics.is_empty() {
        let catalog = session.metrics();
        for m in cli.metrics.iter().filter(|m| !catalog.contains(m)) {
            log::warn!("metric '{m}' does not occur in any loaded file");
        }
        session.set_selected_metrics(cli.metrics.clone());
    }

    session.reprocess();

    match cli.format {
        OutputFormat::Text => print!("{}", report::render_report(&session, cli.snapshot)),
        OutputFormat::Json => {
            let text = json::render_json(&session, cli.snapshot, cli.series)
                .context("serializing JSON report")?;
            println!("{text}");
        }
    }
    Ok(())
}
