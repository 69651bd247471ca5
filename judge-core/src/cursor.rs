//! Page cursors for judgesync.
//!
//! Platforms paginate their submission listings in one of two ways:
//! - By record offset (`first_entry=250`), newest first
//! - By timestamp (`endTime=<unix>`), newest first
//!
//! A [`Cursor`] hides that difference from the sync engine. It produces the
//! first offset, computes the next offset from a fetched batch, and turns the
//! furthest position recorded in storage back into an offset so a crawl can
//! resume after a restart.

use chrono::{DateTime, Utc};
use judge_types::Submission;
use std::fmt;

/// Which stored value a cursor resumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionShape {
    /// Number of stored rows.
    RowCount,
    /// Oldest stored submission date.
    OldestTimestamp,
    /// Newest stored submission date.
    NewestTimestamp,
}

/// The furthest position derived from durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FurthestPosition {
    /// Number of stored rows.
    Count(u64),
    /// A stored date, or `None` when nothing is stored yet.
    Timestamp(Option<DateTime<Utc>>),
}

/// Pagination capability of one platform.
///
/// Implementations are pure: no I/O, no interior state.
pub trait Cursor: Send + Sync {
    /// Position within the platform's listing.
    type Offset: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// The position representing "nothing consumed yet" (the newest page).
    fn initial(&self) -> Self::Offset;

    /// Compute the offset of the page after `batch`.
    ///
    /// An empty batch leaves the offset unchanged; the caller treats the
    /// empty batch itself as end-of-data.
    fn advance(&self, offset: &Self::Offset, batch: &[Submission]) -> Self::Offset;

    /// Which stored value [`Cursor::resume`] expects.
    fn shape(&self) -> PositionShape;

    /// Convert a stored position into an offset.
    ///
    /// Returns `None` if the position has a different shape than
    /// [`Cursor::shape`] asked for.
    fn resume(&self, position: FurthestPosition) -> Option<Self::Offset>;
}

/// Cursor for platforms addressed by record offset.
///
/// The offset counts records already seen; the next page starts right after
/// them. Resuming uses the stored row count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountCursor;

impl Cursor for CountCursor {
    type Offset = u64;

    fn initial(&self) -> u64 {
        0
    }

    fn advance(&self, offset: &u64, batch: &[Submission]) -> u64 {
        offset.saturating_add(batch.len() as u64)
    }

    fn shape(&self) -> PositionShape {
        PositionShape::RowCount
    }

    fn resume(&self, position: FurthestPosition) -> Option<u64> {
        match position {
            FurthestPosition::Count(n) => Some(n),
            FurthestPosition::Timestamp(_) => None,
        }
    }
}

/// Cursor for platforms addressed by an end timestamp.
///
/// The offset is a watermark: pages contain submissions at or before it,
/// newest first. `None` asks for the newest page. Advancing moves the
/// watermark to the oldest date seen, so the crawl walks back in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeCursor;

impl Cursor for TimeCursor {
    type Offset = Option<DateTime<Utc>>;

    fn initial(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn advance(
        &self,
        offset: &Option<DateTime<Utc>>,
        batch: &[Submission],
    ) -> Option<DateTime<Utc>> {
        batch.iter().map(|sub| sub.date).fold(*offset, |t, date| match t {
            Some(t) if t <= date => Some(t),
            _ => Some(date),
        })
    }

    fn shape(&self) -> PositionShape {
        PositionShape::OldestTimestamp
    }

    fn resume(&self, position: FurthestPosition) -> Option<Option<DateTime<Utc>>> {
        match position {
            FurthestPosition::Timestamp(t) => Some(t),
            FurthestPosition::Count(_) => None,
        }
    }
}
