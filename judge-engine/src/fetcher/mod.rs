//! Page fetchers for judgesync.
//!
//! A fetcher turns one offset into one page of normalized submissions. It
//! never touches storage; the [`Scraper`](crate::Scraper) decides what to
//! keep.
//!
//! # Design
//!
//! Fetchers are plain async objects configured once at construction:
//! - `fetch()` requests exactly one page
//! - Failures are classified into [`FetchError`] kinds so the engine can
//!   decide between retrying and giving up
//!
//! # Example
//!
//! ```ignore
//! let fetcher = CsAcademyFetcher::new(FetcherSettings::new("https://csacademy.com"))?;
//! let page = fetcher.fetch(&None).await?;
//! ```

mod csacademy;
mod mock;

pub use csacademy::CsAcademyFetcher;
pub use mock::MockFetcher;

use async_trait::async_trait;
use judge_types::{FetchError, Submission};
use std::time::Duration;

/// Fetches one listing page of a platform.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Offset type this fetcher pages by.
    type Offset: Send + Sync;

    /// Fetch the page at `offset`, newest submission first.
    ///
    /// An empty page means the platform has nothing at or past `offset`.
    async fn fetch(&self, offset: &Self::Offset) -> Result<Vec<Submission>, FetchError>;
}

/// Connection settings of one fetcher instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherSettings {
    /// Scheme and host, without trailing slash.
    pub base_url: String,
    /// Submissions requested per page.
    pub page_size: u32,
    /// Timeout of a single HTTP request.
    pub timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl FetcherSettings {
    /// Settings with default page size, timeout and user agent.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: 100,
            timeout: Duration::from_secs(30),
            user_agent: concat!("judgesync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
