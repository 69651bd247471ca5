//! # judge-engine
//!
//! Incremental multi-source sync engine for judgesync.
//!
//! A [`Scraper`] drives one platform through two passes:
//! - **catch-up** ([`Scraper::parse_new_subs`]): from the newest page until a
//!   page adds nothing new
//! - **backlog** ([`Scraper::parse_backlog`]): from the furthest stored
//!   position until the platform runs out of pages
//!
//! # Architecture
//!
//! ```text
//! Supervisor ──► Scraper (one per platform) ──► PageFetcher ──► HTTP
//!                   │        │
//!                   │        └─► Cursor (judge-core, pure)
//!                   ▼
//!             SubmissionStore (judge-store, SQLite)
//! ```
//!
//! Every platform runs in its own task. The only thing the tasks share is
//! the [`Shutdown`] signal; a failing platform never stops its siblings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fetcher;
pub mod scraper;
pub mod shutdown;
pub mod supervisor;

pub use error::EngineError;
pub use fetcher::{CsAcademyFetcher, FetcherSettings, MockFetcher, PageFetcher};
pub use scraper::{Scraper, ScraperOptions};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use supervisor::{SourceReport, Supervisor, SyncSource};
