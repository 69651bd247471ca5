//! Show what each source has stored.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use judge_core::{FurthestPosition, PositionShape};
use judge_store::SubmissionStore;

use super::open_store;
use crate::config::{Config, SourceConfig};

/// Stored state of one source.
#[derive(Debug, Clone, PartialEq)]
struct SourceStatus {
    rows: u64,
    oldest: Option<DateTime<Utc>>,
    newest: Option<DateTime<Utc>>,
}

/// Run the status command.
pub async fn run(config: &Config) -> Result<()> {
    println!("=== judgesync status ===");
    println!();

    if config.sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    for source in &config.sources {
        let state = if source.enabled { "" } else { " (disabled)" };
        println!("{}{}:", source.name, state);
        println!("  Database: {}", source.database.display());

        match inspect(source).await? {
            None => println!("  Not synced yet"),
            Some(status) => {
                println!("  Rows:     {}", status.rows);
                println!("  Oldest:   {}", format_date(status.oldest));
                println!("  Newest:   {}", format_date(status.newest));
            }
        }
        println!();
    }

    Ok(())
}

/// Read the stored state without creating a missing database.
async fn inspect(source: &SourceConfig) -> Result<Option<SourceStatus>> {
    if !source.database.exists() {
        return Ok(None);
    }

    let store = open_store(source).await?;
    let rows = store
        .count()
        .await
        .with_context(|| format!("Failed to count rows of {}", source.name))?;
    let oldest = timestamp(store.furthest_position(PositionShape::OldestTimestamp).await?);
    let newest = timestamp(store.furthest_position(PositionShape::NewestTimestamp).await?);
    store.close().await;

    Ok(Some(SourceStatus {
        rows,
        oldest,
        newest,
    }))
}

fn timestamp(position: FurthestPosition) -> Option<DateTime<Utc>> {
    match position {
        FurthestPosition::Timestamp(t) => t,
        FurthestPosition::Count(_) => None,
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use judge_store::SqliteStore;
    use judge_types::Submission;

    fn source_at(path: std::path::PathBuf) -> SourceConfig {
        let toml = format!(
            "name = \"CSAcademy\"\nkind = \"csacademy\"\ndatabase = \"{}\"\nbase_url = \"https://csacademy.com\"",
            path.display()
        );
        toml::from_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn missing_database_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csacademy.db");

        assert_eq!(inspect(&source_at(path.clone())).await.unwrap(), None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn reports_rows_and_date_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csacademy.db");
        let old = Utc.with_ymd_and_hms(2023, 5, 1, 8, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();

        let store = SqliteStore::new("CSAcademy", &path).await.unwrap();
        store
            .upsert_batch(&[Submission::new(2, new), Submission::new(1, old)])
            .await
            .unwrap();
        store.close().await;

        let status = inspect(&source_at(path)).await.unwrap().unwrap();
        assert_eq!(status.rows, 2);
        assert_eq!(status.oldest, Some(old));
        assert_eq!(status.newest, Some(new));
    }

    #[test]
    fn dates_format_in_utc() {
        let date = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        assert_eq!(format_date(Some(date)), "2024-02-01 08:00:00 UTC");
        assert_eq!(format_date(None), "-");
    }
}
