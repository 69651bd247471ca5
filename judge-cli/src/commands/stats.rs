//! Export usage statistics.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use judge_store::Statistics;
use std::path::PathBuf;

use super::open_store;
use crate::config::Config;

/// Run the stats command.
pub async fn run(config: &Config, only: &[String], output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| config.stats.output.clone());
    let all = collect(config, only, Utc::now().date_naive()).await?;

    let json = serde_json::to_string_pretty(&all).context("Failed to serialize statistics")?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "Wrote statistics for {} source(s) to {}",
        all.len(),
        path.display()
    );
    Ok(())
}

/// Statistics of every selected source, in configuration order.
///
/// Sources that were never synced are skipped; their database is not created.
async fn collect(config: &Config, only: &[String], today: NaiveDate) -> Result<Vec<Statistics>> {
    let window = config.stats.window();
    let mut all = Vec::new();

    for source in config.selected_sources(only)? {
        if !source.database.exists() {
            tracing::warn!(
                platform = %source.name,
                database = %source.database.display(),
                "Not synced yet, skipping"
            );
            continue;
        }

        let store = open_store(source).await?;
        let stats = store
            .platform_stats(&window, today)
            .await
            .with_context(|| format!("Failed to compute statistics for {}", source.name))?;
        store.close().await;

        tracing::debug!(
            platform = %source.name,
            days = stats.day_stats.len(),
            "Computed statistics"
        );
        all.push(stats);
    }

    Ok(all)
}
