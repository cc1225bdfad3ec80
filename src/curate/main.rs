//! Border checkpoint curation pipeline.
//!
//! Reads the raw snapshots written by the fetchers and produces the final
//! checkpoint and gate records, one stage at a time or all at once.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use borderpost::borders::CountryBorders;
use borderpost::config::Config;
use borderpost::stages::StageReport;
use borderpost::{Pipeline, Stage};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "curate")]
#[command(about = "Curate border checkpoints from raw map snapshots")]
struct Args {
    /// TOML config file (built-in defaults otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the snapshot directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log per-record decisions
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Build the country boundaries and list them
    Borders,
    /// Keep checkpoints near a country border
    Filter,
    /// Collapse near-duplicate checkpoints
    Cluster,
    /// Find each checkpoint's destination country
    Assign,
    /// Attach nearby gates to checkpoints
    LinkGates,
    /// Give every shared gate to its nearest checkpoint
    DedupGates,
    /// Write the final checkpoints as storage rows (CSV)
    Export,
    /// Run filter through dedup-gates
    Run,
}

impl Command {
    fn stage(self) -> Option<Stage> {
        match self {
            Command::Filter => Some(Stage::Filter),
            Command::Cluster => Some(Stage::Cluster),
            Command::Assign => Some(Stage::Assign),
            Command::LinkGates => Some(Stage::LinkGates),
            Command::DedupGates => Some(Stage::DedupGates),
            Command::Export => Some(Stage::Export),
            Command::Borders | Command::Run => None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = args.data_dir {
        config.paths.data_dir = dir;
    }

    info!("Borderpost curation");
    info!("Data directory: {}", config.paths.data_dir.display());

    let pipeline = Pipeline::new(config);

    match args.command {
        Command::Borders => {
            let borders = spinner("borders", || pipeline.load_borders())?;
            for country in borders.iter() {
                info!(
                    "  {}: {} polygons from relations {:?}",
                    country.name,
                    country.geometry.0.len(),
                    country.relation_ids
                );
            }
        }
        Command::Run => {
            let borders: CountryBorders = spinner("borders", || pipeline.load_borders())?;
            let mut reports = Vec::new();
            for stage in Stage::PIPELINE {
                reports.push(spinner(stage.name(), || pipeline.run_stage(stage, Some(&borders)))?);
            }
            summarize(&reports);
        }
        command => {
            if let Some(stage) = command.stage() {
                let report = spinner(stage.name(), || pipeline.run_stage(stage, None))?;
                summarize(&[report]);
            }
        }
    }

    Ok(())
}

/// Run a step behind a progress spinner
fn spinner<T>(name: &str, step: impl FnOnce() -> Result<T>) -> Result<T> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(name.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = step();
    match &result {
        Ok(_) => pb.finish_with_message(format!("{} done", name)),
        Err(_) => pb.abandon_with_message(format!("{} failed", name)),
    }
    result
}

fn summarize(reports: &[StageReport]) {
    for report in reports {
        info!("{}", report);
    }
}
