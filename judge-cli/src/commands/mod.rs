//! CLI command implementations.

pub mod stats;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use judge_store::SqliteStore;

use crate::config::SourceConfig;

/// Open the database of a source, creating its directory if needed.
pub async fn open_store(source: &SourceConfig) -> Result<SqliteStore> {
    if let Some(parent) = source.database.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    SqliteStore::new(&source.name, &source.database)
        .await
        .with_context(|| format!("Failed to open database for {}", source.name))
}
