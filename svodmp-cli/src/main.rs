use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;
use svodmp_core::processor::FileStatus;
use svodmp_core::sheets::HttpSheetsClient;
use svodmp_core::{AppConfig, ProcessOptions, Processor, SheetsApi};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "svodmp")]
#[command(about = "Import retail Excel sales reports into a Google Sheets ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory with .xls/.xlsx report files
    #[arg(short, long, value_name = "DIR")]
    input_dir: PathBuf,

    /// Manual period ("Месяц ГГГГ") for files without one in the name
    #[arg(short, long)]
    period: Option<String>,

    /// Spreadsheet id or full document URL (falls back to config.json)
    #[arg(short, long)]
    spreadsheet_id: Option<String>,

    /// Path to the service-account JSON key
    #[arg(short = 'c', long, value_name = "FILE")]
    credentials: PathBuf,

    /// Log what would be written without touching the document or the
    /// local files
    #[arg(long)]
    dry_run: bool,

    /// Path to config.json
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let spreadsheet_id = cli
        .spreadsheet_id
        .or(config.spreadsheet_id)
        .context("no spreadsheet id given and none found in config.json")?;

    let client = if cli.dry_run {
        None
    } else {
        Some(
            HttpSheetsClient::from_credentials_file(&cli.credentials).with_context(|| {
                format!("failed to load credentials from {}", cli.credentials.display())
            })?,
        )
    };

    let options = ProcessOptions {
        input_dir: cli.input_dir,
        period: cli.period,
        spreadsheet_id,
        dry_run: cli.dry_run,
    };
    let processor = Processor::new(options, client.as_ref().map(|c| c as &dyn SheetsApi));

    let mut progress = |current: usize, total: usize, file: &str| {
        info!("processed {current}/{total}: {file}");
    };
    let outcomes = processor.run(Some(&mut progress))?;

    let mut imported = 0usize;
    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.status {
            FileStatus::Imported { rows } => {
                imported += 1;
                info!("{}: imported {rows} rows", outcome.file);
            }
            FileStatus::DryRun { rows } => {
                info!("{}: [dry run] {rows} rows", outcome.file);
            }
            FileStatus::Empty => info!("{}: nothing to transfer", outcome.file),
            FileStatus::Failed(err) => {
                failed += 1;
                info!("{}: failed: {err}", outcome.file);
            }
        }
    }
    info!(
        "done: {imported} imported, {failed} failed, {} total",
        outcomes.len()
    );
    Ok(())
}
