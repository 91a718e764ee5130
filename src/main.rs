//! desvio-review - Detour event reconciliation CLI
//!
//! Reads a CSV export of the dispatch action log, reconciles every detour
//! code and writes the review table.
//!
//! # Usage
//!
//! ```bash
//! # Reconcile against the PMT registry, JSON to stdout
//! desvio-review --events acciones.csv --registry pmt.csv
//!
//! # CSV report file named after today's date, plus a summary on stderr
//! desvio-review --events acciones.csv --registry pmt.csv --format csv --output-dir reportes --summary
//!
//! # Reproducible run with a pinned reference instant
//! desvio-review --events acciones.csv --now "2025-03-10 18:00:00"
//! ```
//!
//! # Environment Variables
//!
//! - `DESVIO_CONFIG`: Path to a TOML config file (default: ./desvio_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use tracing::{info, warn};

use desvio_review::{
    input, reconcile, report, OutputFormat, ReferenceInstant, Registry, ReviewConfig, ReviewSummary,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "desvio-review")]
#[command(about = "Reconcile detour activation events into a review table")]
#[command(version)]
struct CliArgs {
    /// Action-log CSV export (Fecha, Instante, Parámetros, RUTA, ZONA, Nombre Usuario)
    #[arg(long)]
    events: PathBuf,

    /// PMT registry file (CSV with an ID column, or one code per line).
    /// Unreadable registries degrade to empty: every code is reported as new.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// TOML config file; overrides DESVIO_CONFIG and ./desvio_config.toml.
    /// Unlike those, a bad file given here aborts the run.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (default from config: json)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Write to this file instead of stdout
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write "<prefix> <date>.<ext>" into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print per-code counts to stderr after the pass
    #[arg(long)]
    summary: bool,

    /// Pin the reference instant ("YYYY-MM-DD HH:MM:SS", civil time)
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_now(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {e}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<ReviewConfig> {
    match path {
        Some(p) => ReviewConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(ReviewConfig::load()),
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(args.config.as_ref())?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let input_options = config.input_options();
    let events = input::read_events(&args.events, &input_options)
        .with_context(|| format!("Failed to read events from {}", args.events.display()))?;

    let registry = match &args.registry {
        Some(path) => Registry::load_or_empty(path, input_options.delimiter),
        None => {
            warn!("No PMT registry given, every code will be reported as new");
            Registry::empty()
        }
    };

    // One reference instant for the whole pass
    let now = args.now.map_or_else(
        || ReferenceInstant::capture(config.clock.utc_offset_hours),
        ReferenceInstant::fixed,
    );

    let rows = reconcile(&events, &registry, now, config.reconcile_options());
    let format = args.format.unwrap_or(config.output.format);

    let destination = match (&args.output, &args.output_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join(report::default_file_name(
            &config.output.file_prefix,
            now,
            format,
        ))),
        (None, None) => None,
    };

    match destination {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            report::write_rows(&mut writer, &rows, format)?;
            writer.flush()?;
            info!(path = %path.display(), rows = rows.len(), "Review table written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            report::write_rows(&mut writer, &rows, format)?;
            writer.flush()?;
        }
    }

    if args.summary {
        eprint!("{}", ReviewSummary::from_rows(&rows));
    }

    Ok(())
}
