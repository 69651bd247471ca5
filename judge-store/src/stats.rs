//! Usage statistics over stored submissions.
//!
//! Read-only aggregation over one platform's store: daily buckets, calendar
//! month buckets and rolling buckets of a fixed number of days. Every bucket
//! counts submissions, distinct (user, problem) pairs, distinct users and
//! distinct problems.

use crate::error::StorageError;
use crate::storage::{SqliteStore, SubmissionStore};
use chrono::{DateTime, NaiveDate, Utc};
use judge_core::{FurthestPosition, PositionShape};
use serde::Serialize;

const DAY_STATS: &str = r#"
    WITH starting_data AS (
        SELECT username, problem_id, DATE(date) AS day FROM submissions
    )
    SELECT
        COUNT(*) AS num_submissions,
        COUNT(DISTINCT username || '###' || problem_id) AS excluding_multiple,
        COUNT(DISTINCT username) AS unique_users,
        COUNT(DISTINCT problem_id) AS unique_problems,
        day AS bucket_start
    FROM starting_data GROUP BY day ORDER BY day DESC
    LIMIT ?1
"#;

const MONTH_STATS: &str = r#"
    WITH starting_data AS (
        SELECT username, problem_id, DATE(date, 'start of month') AS day FROM submissions
    )
    SELECT
        COUNT(*) AS num_submissions,
        COUNT(DISTINCT username || '###' || problem_id) AS excluding_multiple,
        COUNT(DISTINCT username) AS unique_users,
        COUNT(DISTINCT problem_id) AS unique_problems,
        day AS bucket_start
    FROM starting_data GROUP BY day ORDER BY day DESC
    LIMIT ?1
"#;

// Bucket 0 holds the `?2` days ending at `?1`, bucket 1 the ones before that
const ROLLING_STATS: &str = r#"
    WITH starting_data AS (
        SELECT username, problem_id, DATE(date) AS day,
            CAST(julianday(?1) - julianday(DATE(date)) AS INTEGER) / ?2 AS bucket
        FROM submissions
    )
    SELECT
        COUNT(*) AS num_submissions,
        COUNT(DISTINCT username || '###' || problem_id) AS excluding_multiple,
        COUNT(DISTINCT username) AS unique_users,
        COUNT(DISTINCT problem_id) AS unique_problems,
        MIN(day) AS bucket_start
    FROM starting_data GROUP BY bucket ORDER BY bucket ASC
    LIMIT ?3
"#;

/// How far back each series of buckets reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    /// Number of daily buckets.
    pub days: u32,
    /// Number of calendar month buckets.
    pub months: u32,
    /// Length of one rolling bucket in days.
    pub rolling_interval_days: u32,
    /// Number of rolling buckets.
    pub rolling_months: u32,
}

impl Default for StatsWindow {
    fn default() -> Self {
        Self {
            days: 180,
            months: 12,
            rolling_interval_days: 30,
            rolling_months: 6,
        }
    }
}

/// One time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    /// First day of the bucket (earliest day with data, for rolling buckets).
    pub time: NaiveDate,
    /// Number of submissions.
    #[serde(rename = "num_subs")]
    pub num_submissions: u64,
    /// Number of distinct (user, problem) pairs.
    pub excluding_multiple: u64,
    /// Number of distinct users.
    pub unique_users: u64,
    /// Number of distinct problems.
    #[serde(rename = "unique_pbs")]
    pub unique_problems: u64,
}

/// Statistics for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Platform the numbers belong to.
    pub platform_name: String,
    /// Date of the newest stored submission.
    #[serde(rename = "last_sub")]
    pub last_submission: Option<DateTime<Utc>>,
    /// Daily buckets, newest first.
    pub day_stats: Vec<StatsRow>,
    /// Rolling buckets, newest first.
    #[serde(rename = "rolling_month_stats")]
    pub rolling_months_stats: Vec<StatsRow>,
    /// Calendar month buckets, newest first.
    #[serde(rename = "month_stats")]
    pub months_stats: Vec<StatsRow>,
}

#[derive(sqlx::FromRow)]
struct BucketRow {
    num_submissions: i64,
    excluding_multiple: i64,
    unique_users: i64,
    unique_problems: i64,
    bucket_start: String,
}

impl TryFrom<BucketRow> for StatsRow {
    type Error = StorageError;

    fn try_from(row: BucketRow) -> Result<Self, Self::Error> {
        let time = NaiveDate::parse_from_str(&row.bucket_start, "%Y-%m-%d").map_err(|_| {
            StorageError::InvalidTimestamp {
                value: row.bucket_start.clone(),
            }
        })?;

        Ok(StatsRow {
            time,
            num_submissions: row.num_submissions as u64,
            excluding_multiple: row.excluding_multiple as u64,
            unique_users: row.unique_users as u64,
            unique_problems: row.unique_problems as u64,
        })
    }
}

impl SqliteStore {
    /// Compute the statistics of this platform.
    ///
    /// Rolling buckets are anchored at `today`.
    pub async fn platform_stats(
        &self,
        window: &StatsWindow,
        today: NaiveDate,
    ) -> Result<Statistics, StorageError> {
        let day_stats = self.buckets(DAY_STATS, window.days).await?;
        let months_stats = self.buckets(MONTH_STATS, window.months).await?;

        let rows = sqlx::query_as::<_, BucketRow>(ROLLING_STATS)
            .bind(today.format("%Y-%m-%d").to_string())
            .bind(i64::from(window.rolling_interval_days.max(1)))
            .bind(i64::from(window.rolling_months))
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::Database)?;
        let rolling_months_stats = rows
            .into_iter()
            .map(StatsRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let last_submission = match self
            .furthest_position(PositionShape::NewestTimestamp)
            .await?
        {
            FurthestPosition::Timestamp(t) => t,
            FurthestPosition::Count(_) => None,
        };

        Ok(Statistics {
            platform_name: self.platform().to_string(),
            last_submission,
            day_stats,
            rolling_months_stats,
            months_stats,
        })
    }

    async fn buckets(&self, sql: &str, limit: u32) -> Result<Vec<StatsRow>, StorageError> {
        let rows = sqlx::query_as::<_, BucketRow>(sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::Database)?;

        rows.into_iter().map(StatsRow::try_from).collect()
    }
}
