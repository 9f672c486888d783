//! CLI for snapbot.
//!
//! Uses clap for argument parsing; the `scan` command drives the full
//! pipeline for one or both venues and writes the result to disk.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::data_paths::{DataPaths, DEFAULT_DATA_DIR};
use crate::logging::{init_logging, LoggingConfig};
use crate::scan;
use crate::sources::{MarketSource, OpinionSource, PredictSource};
use crate::store;

#[derive(Parser)]
#[command(name = "snapbot")]
#[command(version)]
#[command(about = "Concurrent market snapshot fetcher for prediction venues", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory path (default: ./data)
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a full market snapshot from one or both venues
    Scan(ScanArgs),
}

#[derive(clap::Args, Clone)]
pub struct ScanArgs {
    /// Which venue(s) to scan
    #[arg(long, value_enum, default_value_t = SourceKind::All)]
    pub source: SourceKind,

    /// Hard ceiling on listing pages per source
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Stop dispatching new detail fetches after this many seconds
    #[arg(long)]
    pub run_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Opinion,
    Predict,
    All,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let data_paths = DataPaths::new(&self.data_dir);
        init_logging(LoggingConfig::new(data_paths.clone()))?;

        match self.command {
            Commands::Scan(args) => run_scan_command(&data_paths, args).await,
        }
    }
}

async fn run_scan_command(data_paths: &DataPaths, args: ScanArgs) -> Result<()> {
    let kinds: Vec<SourceKind> = match args.source {
        SourceKind::All => vec![SourceKind::Opinion, SourceKind::Predict],
        kind => vec![kind],
    };

    let mut failures = 0usize;
    for kind in kinds {
        let fatal = match kind {
            SourceKind::Opinion => {
                let config = apply_overrides(
                    SourceConfig::opinion(require_env("OPINION_API_KEY")?),
                    &args,
                );
                let source = OpinionSource::new(&config)?;
                scan_one(data_paths, &source, &config).await?
            }
            SourceKind::Predict => {
                let config = apply_overrides(
                    SourceConfig::predict(require_env("PREDICT_API_KEY")?),
                    &args,
                );
                let source = PredictSource::new(&config)?;
                scan_one(data_paths, &source, &config).await?
            }
            SourceKind::All => unreachable!("expanded above"),
        };
        if fatal {
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} source(s) failed", failures));
    }
    Ok(())
}

/// Run one source end to end. Returns true if the scan was fatal; the error
/// record is already on disk in that case.
async fn scan_one<S: MarketSource>(
    data_paths: &DataPaths,
    source: &S,
    config: &SourceConfig,
) -> Result<bool> {
    println!(
        "{}",
        format!("🔄 Scanning {}...", source.name()).bright_blue()
    );

    match scan::run_scan(source, config.run_timeout).await {
        Ok(snapshot) => {
            let path = store::save_snapshot(data_paths, source.name(), &snapshot)?;
            println!(
                "{}",
                format!(
                    "✅ {}: {} markets, {} tokens",
                    source.name(),
                    snapshot.market_count.to_string().bright_green(),
                    snapshot.token_count.to_string().bright_green()
                )
            );
            println!(
                "{}",
                format!("💾 Saved to: {}", path.display()).bright_blue()
            );
            Ok(false)
        }
        Err(e) => {
            let path = store::save_error(data_paths, source.name(), &e.to_string())?;
            println!("{}", format!("❌ {}: {}", source.name(), e).bright_red());
            println!(
                "{}",
                format!("💾 Error record: {}", path.display()).bright_blue()
            );
            Ok(true)
        }
    }
}

fn apply_overrides(mut config: SourceConfig, args: &ScanArgs) -> SourceConfig {
    if let Some(max_pages) = args.max_pages {
        config = config.with_max_pages(max_pages);
    }
    if let Some(secs) = args.run_timeout_secs {
        config = config.with_run_timeout(Duration::from_secs(secs));
    }
    config
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("{} is not set (check your .env)", name))
}
