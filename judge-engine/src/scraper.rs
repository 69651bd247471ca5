//! Per-platform sync loops.
//!
//! A [`Scraper`] combines a [`PageFetcher`], a [`Cursor`] and a
//! [`SubmissionStore`] for one platform and runs the two sync passes over
//! them. Within one platform everything is sequential: a page is stored
//! before the next one is requested.

use crate::error::EngineError;
use crate::fetcher::PageFetcher;
use crate::shutdown::Shutdown;
use judge_core::{Backoff, Cursor, FetchDecision, RetryPolicy, SyncMode, SyncOutcome, Termination};
use judge_store::SubmissionStore;
use judge_types::{FetchError, Submission};

/// Retry tuning of a [`Scraper`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScraperOptions {
    /// Failure limits.
    pub policy: RetryPolicy,
    /// Delay between retries.
    pub backoff: Backoff,
}

/// Sync engine for one platform.
#[derive(Debug)]
pub struct Scraper<F, C, S> {
    fetcher: F,
    cursor: C,
    store: S,
    options: ScraperOptions,
}

impl<F, C, S> Scraper<F, C, S>
where
    C: Cursor,
    F: PageFetcher<Offset = C::Offset>,
    S: SubmissionStore,
{
    /// Create a scraper.
    pub fn new(fetcher: F, cursor: C, store: S, options: ScraperOptions) -> Self {
        Self {
            fetcher,
            cursor,
            store,
            options,
        }
    }

    /// The store this scraper writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Platform name, taken from the store.
    pub fn platform(&self) -> &str {
        self.store.platform()
    }

    /// Forward catch-up.
    ///
    /// Walks from the newest page towards older ones and stops at the first
    /// page that adds no new row. Fetch errors end the pass with an error;
    /// store errors are retried up to `max_store_retries` times.
    pub async fn parse_new_subs(&self, shutdown: &Shutdown) -> Result<SyncOutcome, EngineError> {
        let mode = SyncMode::CatchUp;
        let mut outcome = SyncOutcome::new(mode, Termination::Converged);
        let mut offset = self.cursor.initial();

        tracing::info!(platform = %self.platform(), "Starting catch-up");

        loop {
            if shutdown.is_triggered() {
                return Ok(self.finish(outcome, Termination::Cancelled));
            }

            let batch = match self.fetch_page(&offset, shutdown).await {
                Ok(batch) => batch,
                Err(error) => match self.options.policy.on_fetch_error(mode, &error, 0) {
                    FetchDecision::Stop => {
                        return Ok(self.finish(outcome, Termination::Cancelled));
                    }
                    FetchDecision::Retry | FetchDecision::Fail => {
                        return Err(self.fetch_failed(error));
                    }
                },
            };
            outcome.pages += 1;

            let Some(inserted) = self.store_page(mode, &batch, shutdown).await? else {
                return Ok(self.finish(outcome, Termination::Cancelled));
            };
            outcome.inserted += inserted;

            tracing::debug!(
                platform = %self.platform(),
                offset = ?offset,
                fetched = batch.len(),
                inserted,
                "Stored page"
            );

            if inserted == 0 {
                return Ok(self.finish(outcome, Termination::Converged));
            }
            offset = self.cursor.advance(&offset, &batch);
        }
    }

    /// Backlog crawl.
    ///
    /// Starts from the furthest stored position and walks towards older
    /// pages until the platform returns an empty page. After every page the
    /// offset is derived again from the store. Transport and store errors
    /// are retried until shutdown; shape errors until `max_shape_failures`
    /// consecutive failures. A page that leaves the position unchanged is
    /// refetched after a backoff delay, until shutdown or, when set, until
    /// `max_stalled_pages` such pages in a row.
    pub async fn parse_backlog(&self, shutdown: &Shutdown) -> Result<SyncOutcome, EngineError> {
        let mode = SyncMode::Backlog;
        let mut outcome = SyncOutcome::new(mode, Termination::ReachedEnd);
        let mut offset = self.furthest().await?;

        let mut shape_failures = 0u32;
        let mut fetch_attempts = 0u32;
        let mut stalled_pages = 0u32;

        tracing::info!(platform = %self.platform(), offset = ?offset, "Starting backlog crawl");

        loop {
            if shutdown.is_triggered() {
                return Ok(self.finish(outcome, Termination::Cancelled));
            }

            let batch = match self.fetch_page(&offset, shutdown).await {
                Ok(batch) => batch,
                Err(error) => {
                    if matches!(error, FetchError::Shape(_)) {
                        shape_failures += 1;
                    }
                    match self.options.policy.on_fetch_error(mode, &error, shape_failures) {
                        FetchDecision::Stop => {
                            return Ok(self.finish(outcome, Termination::Cancelled));
                        }
                        FetchDecision::Fail => return Err(self.fetch_failed(error)),
                        FetchDecision::Retry => {
                            fetch_attempts += 1;
                            tracing::warn!(
                                platform = %self.platform(),
                                offset = ?offset,
                                attempt = fetch_attempts,
                                "Fetch failed, retrying: {}",
                                error
                            );
                            if !self.pause(fetch_attempts, shutdown).await {
                                return Ok(self.finish(outcome, Termination::Cancelled));
                            }
                            continue;
                        }
                    }
                }
            };
            shape_failures = 0;
            fetch_attempts = 0;
            outcome.pages += 1;

            if batch.is_empty() {
                return Ok(self.finish(outcome, Termination::ReachedEnd));
            }

            let Some(inserted) = self.store_page(mode, &batch, shutdown).await? else {
                return Ok(self.finish(outcome, Termination::Cancelled));
            };
            outcome.inserted += inserted;

            let next = match self.furthest().await {
                Ok(next) => next,
                Err(EngineError::Store { source, .. }) => {
                    tracing::warn!(
                        platform = %self.platform(),
                        "Could not read furthest position, advancing from page: {}",
                        source
                    );
                    self.cursor.advance(&offset, &batch)
                }
                Err(e) => return Err(e),
            };

            tracing::debug!(
                platform = %self.platform(),
                offset = ?offset,
                next = ?next,
                fetched = batch.len(),
                inserted,
                "Stored backlog page"
            );

            if next == offset {
                stalled_pages += 1;
                let limit = self.options.policy.max_stalled_pages;
                if limit > 0 && stalled_pages >= limit {
                    return Err(EngineError::Stalled {
                        platform: self.platform().to_string(),
                        offset: format!("{offset:?}"),
                        pages: stalled_pages,
                    });
                }
                tracing::warn!(
                    platform = %self.platform(),
                    offset = ?offset,
                    attempt = stalled_pages,
                    "Page did not move the stored position, refetching"
                );
                if !self.pause(stalled_pages, shutdown).await {
                    return Ok(self.finish(outcome, Termination::Cancelled));
                }
            } else {
                stalled_pages = 0;
            }
            offset = next;
        }
    }

    /// Resume offset derived from the store.
    async fn furthest(&self) -> Result<C::Offset, EngineError> {
        let position = self
            .store
            .furthest_position(self.cursor.shape())
            .await
            .map_err(|source| EngineError::Store {
                platform: self.platform().to_string(),
                source,
            })?;

        self.cursor
            .resume(position)
            .ok_or_else(|| EngineError::PositionMismatch {
                platform: self.platform().to_string(),
                position,
            })
    }

    /// Fetch one page, abandoning the request on shutdown.
    async fn fetch_page(
        &self,
        offset: &C::Offset,
        shutdown: &Shutdown,
    ) -> Result<Vec<Submission>, FetchError> {
        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(FetchError::Cancelled),
            result = self.fetcher.fetch(offset) => result,
        }
    }

    /// Upsert a page, retrying failed transactions.
    ///
    /// Returns `None` if shutdown was requested while waiting to retry. The
    /// upsert itself is never interrupted.
    async fn store_page(
        &self,
        mode: SyncMode,
        batch: &[Submission],
        shutdown: &Shutdown,
    ) -> Result<Option<u64>, EngineError> {
        let mut attempt = 0u32;
        loop {
            match self.store.upsert_batch(batch).await {
                Ok(inserted) => return Ok(Some(inserted)),
                Err(source) => {
                    attempt += 1;
                    if mode == SyncMode::CatchUp && attempt > self.options.policy.max_store_retries
                    {
                        return Err(EngineError::Store {
                            platform: self.platform().to_string(),
                            source,
                        });
                    }
                    tracing::warn!(
                        platform = %self.platform(),
                        attempt,
                        "Storing page failed, retrying: {}",
                        source
                    );
                    if !self.pause(attempt, shutdown).await {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Sleep before retry `attempt`. Returns false if shutdown interrupted it.
    async fn pause(&self, attempt: u32, shutdown: &Shutdown) -> bool {
        let delay = self.options.backoff.delay(attempt);
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = shutdown.triggered() => false,
        }
    }

    fn fetch_failed(&self, source: FetchError) -> EngineError {
        EngineError::Fetch {
            platform: self.platform().to_string(),
            source,
        }
    }

    fn finish(&self, mut outcome: SyncOutcome, termination: Termination) -> SyncOutcome {
        outcome.termination = termination;
        tracing::info!(platform = %self.platform(), "Finished {}", outcome);
        outcome
    }
}
