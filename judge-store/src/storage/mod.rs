//! Storage layer for judge-store.
//!
//! Provides idempotent submission storage with position queries.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StorageError;
use async_trait::async_trait;
use judge_core::{FurthestPosition, PositionShape};
use judge_types::{Submission, SubmissionId};

/// Trait for submission storage backends.
///
/// One store holds the submissions of exactly one platform.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Name of the platform this store belongs to.
    fn platform(&self) -> &str;

    /// Write the finalized submissions of one fetched page.
    ///
    /// Runs in a single transaction. Submissions with `finalized == false`
    /// are skipped. An id that is already stored is overwritten with the new
    /// values but not counted. A row that fails to write is logged and
    /// skipped; a failing commit rolls back the whole page.
    ///
    /// Returns the number of new rows.
    async fn upsert_batch(&self, batch: &[Submission]) -> Result<u64, StorageError>;

    /// Total number of stored submissions.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Whether a submission with this id is stored.
    async fn exists(&self, id: SubmissionId) -> Result<bool, StorageError>;

    /// The furthest position reached, in the requested shape.
    async fn furthest_position(
        &self,
        shape: PositionShape,
    ) -> Result<FurthestPosition, StorageError>;
}
