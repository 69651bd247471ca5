//! SQLite storage backend for judge-store.

use super::SubmissionStore;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use judge_core::{FurthestPosition, PositionShape};
use judge_types::{Submission, SubmissionId};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Stored date format. Fixed width UTC, so text ordering is time ordering and
/// SQLite date functions accept it as is.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const INSERT_SUBMISSION: &str = r#"
    INSERT OR IGNORE INTO submissions
        (id, username, display_name, problem_id, problem_name, size_kb, date,
         ignored, compile_error, internal_error, score)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

const REPLACE_SUBMISSION: &str = r#"
    INSERT OR REPLACE INTO submissions
        (id, username, display_name, problem_id, problem_name, size_kb, date,
         ignored, compile_error, internal_error, score)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

/// SQLite-based submission storage for one platform.
///
/// Uses WAL mode so readers only ever see committed pages.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    platform: String,
}

impl SqliteStore {
    /// Open (or create) the database file for a platform.
    ///
    /// Creates the `submissions` table if it doesn't exist.
    pub async fn new(platform: &str, path: &Path) -> Result<Self, StorageError> {
        if path.as_os_str().is_empty() || path.is_dir() {
            return Err(StorageError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let store = Self {
            pool,
            platform: platform.to_string(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory(platform: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // A single connection that never recycles, or the database is lost
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let store = Self {
            pool,
            platform: platform.to_string(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY,

                username TEXT NOT NULL,
                display_name TEXT NOT NULL,

                problem_id TEXT,
                problem_name TEXT,

                size_kb REAL,
                date TEXT NOT NULL,

                ignored BOOLEAN NOT NULL DEFAULT FALSE,
                compile_error BOOLEAN NOT NULL DEFAULT FALSE,
                internal_error BOOLEAN NOT NULL DEFAULT FALSE,
                score INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_date ON submissions(date)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(())
    }

    /// Connection pool, for the statistics queries.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a stored submission by id.
    pub async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StorageError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, username, display_name, problem_id, problem_name, size_kb, date,
                   ignored, compile_error, internal_error, score
            FROM submissions
            WHERE id = ?1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        row.map(Submission::try_from).transpose()
    }

    /// Close the pool. Later operations fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Write one submission. Returns `true` if the id was not stored before.
    async fn upsert_one(
        conn: &mut SqliteConnection,
        sub: &Submission,
    ) -> Result<bool, sqlx::Error> {
        let result = execute_submission(conn, INSERT_SUBMISSION, sub).await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Already stored: overwrite so the row holds the latest observation
        execute_submission(conn, REPLACE_SUBMISSION, sub).await?;
        Ok(false)
    }

    async fn date_bound(&self, sql: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let value: Option<String> = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        value.as_deref().map(decode_date).transpose()
    }
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn upsert_batch(&self, batch: &[Submission]) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;
        let mut inserted = 0;

        for sub in batch.iter().filter(|sub| sub.finalized) {
            match Self::upsert_one(&mut *tx, sub).await {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        platform = %self.platform,
                        id = %sub.id,
                        error = %e,
                        "failed to store submission, skipping"
                    );
                }
            }
        }

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(inserted)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(count as u64)
    }

    async fn exists(&self, id: SubmissionId) -> Result<bool, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE id = ?1")
            .bind(id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(count > 0)
    }

    async fn furthest_position(
        &self,
        shape: PositionShape,
    ) -> Result<FurthestPosition, StorageError> {
        match shape {
            PositionShape::RowCount => Ok(FurthestPosition::Count(self.count().await?)),
            PositionShape::OldestTimestamp => Ok(FurthestPosition::Timestamp(
                self.date_bound("SELECT MIN(date) FROM submissions").await?,
            )),
            PositionShape::NewestTimestamp => Ok(FurthestPosition::Timestamp(
                self.date_bound("SELECT MAX(date) FROM submissions").await?,
            )),
        }
    }
}

async fn execute_submission(
    conn: &mut SqliteConnection,
    sql: &str,
    sub: &Submission,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(sql)
        .bind(sub.id.value())
        .bind(sub.username.as_str())
        .bind(sub.display_name.as_str())
        .bind(sub.problem_id.as_deref())
        .bind(sub.problem_name.as_deref())
        .bind(sub.size_kb)
        .bind(encode_date(&sub.date))
        .bind(sub.ignored)
        .bind(sub.compile_error)
        .bind(sub.internal_error)
        .bind(sub.score)
        .execute(conn)
        .await
}

pub(crate) fn encode_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn decode_date(value: &str) -> Result<DateTime<Utc>, StorageError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| StorageError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: i64,
    username: String,
    display_name: String,
    problem_id: Option<String>,
    problem_name: Option<String>,
    size_kb: Option<f64>,
    date: String,
    ignored: bool,
    compile_error: bool,
    internal_error: bool,
    score: Option<i64>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StorageError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            id: SubmissionId::new(row.id),
            username: row.username,
            display_name: row.display_name,
            problem_id: row.problem_id,
            problem_name: row.problem_name,
            size_kb: row.size_kb,
            date: decode_date(&row.date)?,
            ignored: row.ignored,
            compile_error: row.compile_error,
            internal_error: row.internal_error,
            score: row.score,
            // Only finalized submissions are ever written
            finalized: true,
        })
    }
}
