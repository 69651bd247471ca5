//! # judge-store
//!
//! Durable submission storage for judgesync.
//!
//! Each platform owns one SQLite database with a single `submissions` table
//! keyed by the platform's submission id. The store:
//! - Upserts fetched pages idempotently, counting only genuinely new rows
//! - Never persists submissions that are still being evaluated
//! - Derives the furthest crawled position from the stored rows
//! - Answers the aggregate queries behind the usage statistics
//!
//! ## Architecture
//!
//! ```text
//!  Scraper (one per platform)
//!      │ upsert_batch / furthest_position
//!      ▼
//! ┌────────────────────────────┐
//! │   SubmissionStore (trait)  │
//! │  ┌──────────────────────┐  │
//! │  │ SQLite (submissions) │  │
//! │  └──────────────────────┘  │
//! └────────────────────────────┘
//!      ▲ read-only
//!      │ platform_stats
//!  stats export
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod stats;
pub mod storage;

pub use error::StorageError;
pub use stats::{Statistics, StatsRow, StatsWindow};
pub use storage::{SqliteStore, SubmissionStore};
