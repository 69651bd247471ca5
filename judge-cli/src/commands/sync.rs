//! Catch-up and backlog passes over the configured sources.

use anyhow::{Context, Result};
use judge_core::{SyncMode, TimeCursor};
use judge_engine::{
    shutdown_channel, CsAcademyFetcher, Scraper, ScraperOptions, SourceReport, Supervisor,
    SyncSource,
};
use std::sync::Arc;

use super::open_store;
use crate::config::{Config, SourceConfig, SourceKind};

/// Run the catch-up command.
pub async fn catch_up(config: &Config, only: &[String]) -> Result<()> {
    run(config, only, SyncMode::CatchUp).await
}

/// Run the backlog command. Stops on Ctrl+C.
pub async fn backlog(config: &Config, only: &[String]) -> Result<()> {
    run(config, only, SyncMode::Backlog).await
}

async fn run(config: &Config, only: &[String], mode: SyncMode) -> Result<()> {
    let supervisor = build_supervisor(config, only).await?;
    if supervisor.is_empty() {
        println!("No enabled sources.");
        return Ok(());
    }

    println!("Running {} on {} source(s)...", mode, supervisor.len());

    let (trigger, shutdown) = shutdown_channel();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping");
            trigger.trigger();
        }
    });

    let reports = supervisor.run(mode, shutdown).await;
    ctrl_c.abort();

    summarize(&reports)
}

/// Build one scraper per selected source.
pub async fn build_supervisor(config: &Config, only: &[String]) -> Result<Supervisor> {
    let options = config.engine.scraper_options();
    let mut supervisor = Supervisor::new();

    for source in config.selected_sources(only)? {
        supervisor.add(build_source(source, options).await?);
    }

    Ok(supervisor)
}

async fn build_source(
    source: &SourceConfig,
    options: ScraperOptions,
) -> Result<Arc<dyn SyncSource>> {
    let store = open_store(source).await?;

    match source.kind {
        SourceKind::CsAcademy => {
            let fetcher = CsAcademyFetcher::new(source.fetcher_settings())
                .with_context(|| format!("Failed to create fetcher for {}", source.name))?;
            Ok(Arc::new(Scraper::new(fetcher, TimeCursor, store, options)))
        }
    }
}

/// Print one line per source; fail if any source failed.
fn summarize(reports: &[SourceReport]) -> Result<()> {
    let mut failed = 0;
    for report in reports {
        match &report.result {
            Ok(outcome) => println!("  {}: {}", report.platform, outcome),
            Err(e) => {
                failed += 1;
                println!("  {}: FAILED ({})", report.platform, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} source(s) failed", failed, reports.len());
    }
    Ok(())
}
