//! CLI entry point for the bike-share trip cleaner.
//!
//! `run` reconciles trip logs exported under different schemas into one
//! cleaned CSV (and optionally a snapshot); `summary` reloads a snapshot
//! and prints its diagnostic summary.

use anyhow::{Context, Result};
use bikeshare_clean::config::{DEFAULT_OUTPUT, PipelineConfig, SourceSpec, TimezonePolicy};
use bikeshare_clean::output::{log_json, print_summary, read_snapshot, write_snapshot, write_trips_csv};
use bikeshare_clean::pipeline::run;
use bikeshare_clean::stats::RideSummary;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_clean")]
#[command(about = "Reconcile bike-share trip logs into one cleaned dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, merge, enrich and filter trip logs
    Run {
        /// Input file as VARIANT=PATH (variant `a` or `b`); repeat in merge order
        #[arg(short, long = "source", value_name = "VARIANT=PATH")]
        sources: Vec<SourceSpec>,

        /// How timestamps without an offset are interpreted
        #[arg(long, value_enum, default_value_t = TimezonePolicy::AssumeUtc)]
        tz_policy: TimezonePolicy,

        /// CSV file to write the cleaned trips to
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Optional: gzip JSON snapshot of the cleaned trips
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Optional: JSON config file; replaces the flags above
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Print the diagnostic summary of a previously written snapshot
    Summary {
        /// Snapshot written by `run --snapshot`
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bikeshare_clean.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_clean.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            sources,
            tz_policy,
            output,
            snapshot,
            config,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig {
                    sources,
                    tz_policy,
                    output,
                    snapshot,
                },
            };
            clean(&config)?;
        }
        Commands::Summary { snapshot } => {
            let snapshot = read_snapshot(&snapshot)?;
            let summary = RideSummary::from_trips(&snapshot.trips);
            log_json(&summary)?;
            print_summary(&summary);
        }
    }

    Ok(())
}

/// Runs the pipeline, then writes the CSV, the optional snapshot, and the
/// summary. Nothing is written if any stage fails.
#[tracing::instrument(skip(config), fields(output = %config.output.display()))]
fn clean(config: &PipelineConfig) -> Result<()> {
    let result = run(config).context("pipeline aborted")?;
    let trips = &result.trips.rows;

    write_trips_csv(&config.output, trips)?;
    if let Some(path) = &config.snapshot {
        write_snapshot(path, trips)?;
    }

    let summary = RideSummary::from_trips(trips);
    log_json(&summary)?;
    print_summary(&summary);

    info!(
        kept = result.report.kept_rows,
        dropped = result.report.dropped_rows(),
        "Finished cleaning trips"
    );
    Ok(())
}
