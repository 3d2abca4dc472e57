//! Scanly - links video files from a download directory into a media library.
//!
//! Settings come from environment variables (see `ScanConfig::from_env`); the
//! command line only picks the mode.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scanly_core::{CancellationToken, ScanConfig, ScanlyBuilder, TitleIndex};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scanly")]
#[command(about = "Match media files to canonical names and link them into a library")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Scan the source directory until interrupted
    Scan {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,

        /// Seconds between passes in daemon mode (overrides SCAN_INTERVAL_SECONDS)
        #[arg(long)]
        interval: Option<u64>,

        /// Log planned links without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },
    /// Load an IMDb title.basics.tsv file into the local title index
    ImportTitles {
        /// Path to title.basics.tsv
        tsv: PathBuf,

        /// Index database (defaults to IMDB_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Scan {
            once: true,
            interval: None,
            dry_run: false,
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command.unwrap_or_default() {
        Command::Scan {
            once,
            interval,
            dry_run,
        } => scan(!once, interval, dry_run).await,
        Command::ImportTitles { tsv, db } => {
            let db = db
                .or_else(|| std::env::var_os("IMDB_DB_PATH").map(PathBuf::from))
                .context("pass --db or set IMDB_DB_PATH")?;
            import_titles(&tsv, &db)?;
            Ok(())
        }
    }
}

async fn scan(daemon: bool, interval: Option<u64>, dry_run: bool) -> Result<()> {
    let mut config = ScanConfig::from_env().context("invalid configuration")?;
    config.dry_run = dry_run;
    if let Some(seconds) = interval {
        config.scan_interval = Duration::from_secs(seconds);
    }
    let scan_interval = config.scan_interval;

    info!("Starting Scanly");
    info!("Source: {}", config.source_dir.display());
    info!("State file: {}", config.state_file.display());
    if dry_run {
        warn!("Dry-run: no links, sidecars or state will be written");
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        handler_token.cancel();
    })
    .context("failed to install signal handler")?;

    let mut scan_loop = ScanlyBuilder::new(config).build(cancel).await?;
    if daemon {
        scan_loop.run_forever(scan_interval).await?;
    } else {
        let summary = scan_loop.run_pass().await?;
        info!(
            "Linked {} file(s), {} unmatched, {} error(s)",
            summary.linked(),
            summary.unmatched,
            summary.errors
        );
    }

    info!("Shutdown complete");
    Ok(())
}

fn import_titles(tsv: &Path, db: &Path) -> Result<usize> {
    let index = TitleIndex::new(db)
        .with_context(|| format!("failed to open title index {}", db.display()))?;
    let imported = index
        .import_tsv(tsv)
        .with_context(|| format!("failed to import {}", tsv.display()))?;
    info!("Title index now holds {} titles", index.count()?);
    Ok(imported)
}
