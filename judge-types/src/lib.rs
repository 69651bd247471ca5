//! # judge-types
//!
//! Shared record types for judgesync.
//!
//! This crate provides the foundational types used across all judgesync crates:
//! - [`Submission`], [`SubmissionId`] - The normalized record every source produces
//! - [`FetchError`] - Failure kinds a page fetcher can report

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod submission;

pub use error::FetchError;
pub use submission::{Submission, SubmissionId};
