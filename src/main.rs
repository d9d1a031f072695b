use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use biathlon_timer::{
    build_report, render_json, render_text, RaceConfig, RaceLedger, ReportSettings,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Builds the results table of a biathlon race from its event log.
#[derive(Parser, Debug)]
#[command(name = "biathlon_timer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Race configuration (JSON)
    #[arg(short, long, default_value = "configs/config.json")]
    config: PathBuf,

    /// Incoming event log, one event per line
    #[arg(short, long, default_value = "events")]
    events: PathBuf,

    /// Where the results table is written
    #[arg(short, long, default_value = "resulting_table")]
    output: PathBuf,

    /// Results table format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = RaceConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    tracing::info!(
        laps = cfg.laps,
        lap_len = cfg.lap_len,
        penalty_len = cfg.penalty_len,
        firing_lines = cfg.firing_lines,
        "loaded race config"
    );

    let events = File::open(&cli.events)
        .with_context(|| format!("failed to open events {}", cli.events.display()))?;

    let mut ledger = RaceLedger::from_config(&cfg);
    let applied = ledger.ingest(BufReader::new(events))?;
    tracing::info!(applied, competitors = ledger.len(), "event log processed");

    let rows = build_report(&ledger, &ReportSettings::from(&cfg));

    let out = File::create(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    let mut out = BufWriter::new(out);
    match cli.format {
        Format::Text => render_text(&rows, &mut out)?,
        Format::Json => render_json(&rows, &mut out)?,
    }
    out.flush()
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    tracing::info!("results written to {}", cli.output.display());
    Ok(())
}
