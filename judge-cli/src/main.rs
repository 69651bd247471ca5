//! # judgesync
//!
//! Keeps local SQLite copies of online-judge submission listings.
//!
//! ## Commands
//!
//! - `catch-up`: Fetch new submissions until every source is up to date
//! - `backlog`: Crawl older submissions until the sources run out (Ctrl+C stops)
//! - `stats`: Export usage statistics as JSON
//! - `status`: Show what each source has stored
//!
//! ## Example
//!
//! ```bash
//! # Sync recent submissions of every enabled source
//! judgesync --config judgesync.toml catch-up
//!
//! # Crawl the history of one source
//! judgesync backlog --source CSAcademy
//!
//! # Export statistics
//! judgesync stats --output stats.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{stats, status, sync};
use config::Config;

/// Keeps local copies of online-judge submission listings.
#[derive(Parser, Debug)]
#[command(name = "judgesync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = "judgesync.toml")]
    config: PathBuf,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch new submissions until no page adds anything
    CatchUp {
        /// Only sync this source (repeatable)
        #[arg(long = "source", short)]
        sources: Vec<String>,
    },

    /// Crawl older submissions until the source runs out of pages
    Backlog {
        /// Only sync this source (repeatable)
        #[arg(long = "source", short)]
        sources: Vec<String>,
    },

    /// Export usage statistics as JSON
    Stats {
        /// Only include this source (repeatable)
        #[arg(long = "source", short)]
        sources: Vec<String>,

        /// Output file (defaults to stats.output from the config)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show what each source has stored
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::CatchUp { sources } => {
            sync::catch_up(&config, &sources).await?;
        }
        Commands::Backlog { sources } => {
            sync::backlog(&config, &sources).await?;
        }
        Commands::Stats { sources, output } => {
            stats::run(&config, &sources, output).await?;
        }
        Commands::Status => {
            status::run(&config).await?;
        }
    }

    Ok(())
}
