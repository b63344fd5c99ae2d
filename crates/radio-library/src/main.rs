use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use radio_lib::{
    CacheValidator, Catalog, CleanupChoice, EventSink, LibraryConfig, LibraryCoordinator,
    ScanEvent,
};

#[derive(Parser)]
#[command(name = "radio-scan", version, about = "Index and maintain the osu-radio song catalog")]
struct Cli {
    /// Configuration file
    #[arg(short, long, value_name = "PATH", default_value = "radio.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the catalog, scanning only when the cache cannot be used
    Reload {
        /// Rescan even if the cache is valid
        #[arg(short, long)]
        force: bool,

        /// What to do when a few cached songs are missing
        #[arg(long, value_enum, default_value_t = Cleanup::Purge)]
        cleanup: Cleanup,
    },
    /// Report whether the cached catalog can be used
    Validate,
    /// Show catalog counts per source folder
    Stats,
    /// Drop every cached record
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum Cleanup {
    Purge,
    Rescan,
    Keep,
}

impl From<Cleanup> for CleanupChoice {
    fn from(c: Cleanup) -> Self {
        match c {
            Cleanup::Purge => CleanupChoice::Purge,
            Cleanup::Rescan => CleanupChoice::Rescan,
            Cleanup::Keep => CleanupChoice::UseAsIs,
        }
    }
}

fn log_sink() -> EventSink {
    Arc::new(|event: &ScanEvent| match event {
        ScanEvent::Started { job_id, folder } => info!(%job_id, %folder, "scan started"),
        ScanEvent::Progress { message, .. } => info!("{}", message),
        ScanEvent::Done { job_id, count } => info!(%job_id, count, "scan done"),
        ScanEvent::Cancelled { job_id } => info!(%job_id, "scan cancelled"),
    })
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = LibraryConfig::load(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;

    match cli.command {
        Command::Reload { force, cleanup } => {
            config.ensure_custom_folder()?;
            let coordinator = LibraryCoordinator::from_config(&config)
                .context("set primary_folder in the config file")?
                .with_sink(log_sink());

            let choice = CleanupChoice::from(cleanup);
            let tracks = coordinator
                .reload_blocking(force, |v| {
                    info!(reason = %v.reason, ?choice, "cache needs cleanup");
                    choice
                })
                .context("scan was cancelled")?;
            println!("{} songs in catalog", tracks.len());
        }
        Command::Validate => {
            let primary = config
                .primary_folder
                .as_ref()
                .context("set primary_folder in the config file")?;
            let primary = std::path::absolute(primary)?;
            let catalog = Catalog::new(&config.database_path);
            let verdict = CacheValidator::new(&catalog).validate(&primary.to_string_lossy());
            println!(
                "{}: {} ({} cached, {} missing)",
                if verdict.is_valid() { "valid" } else { "invalid" },
                verdict.reason,
                verdict.total,
                verdict.missing.len()
            );
        }
        Command::Stats => {
            let stats = Catalog::new(&config.database_path).stats();
            println!("{} songs", stats.total);
            for source in stats.per_source {
                println!(
                    "  {}: {} songs, last scan {}",
                    source.source_folder.as_deref().unwrap_or("(legacy)"),
                    source.tracks,
                    source.last_scan.as_deref().unwrap_or("never")
                );
            }
        }
        Command::Clear => {
            let catalog = Catalog::new(&config.database_path);
            anyhow::ensure!(catalog.clear(), "failed to clear {}", catalog.path().display());
            println!("catalog cleared");
        }
    }

    Ok(())
}
