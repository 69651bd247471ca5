//! # judge-core
//!
//! Pure logic for judgesync (no I/O, instant tests).
//!
//! This crate implements the pagination and retry decisions of the sync
//! engine without any network or disk I/O:
//! - [`Cursor`] - How a platform's pages are addressed and advanced
//! - [`RetryPolicy`] - What to do after a failed page fetch
//! - [`SyncOutcome`] - How a sync pass ended
//!
//! The actual I/O (HTTP, SQLite) is performed by `judge-engine` and
//! `judge-store`, which consult these types at every step.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod outcome;
pub mod retry;

pub use cursor::{CountCursor, Cursor, FurthestPosition, PositionShape, TimeCursor};
pub use outcome::{SyncMode, SyncOutcome, Termination};
pub use retry::{Backoff, FetchDecision, RetryPolicy};
