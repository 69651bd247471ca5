//! Runs several platforms side by side.

use crate::error::EngineError;
use crate::fetcher::PageFetcher;
use crate::scraper::Scraper;
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use judge_core::{Cursor, SyncMode, SyncOutcome};
use judge_store::SubmissionStore;
use std::sync::Arc;

/// A platform the [`Supervisor`] can drive, independent of its offset type.
#[async_trait]
pub trait SyncSource: Send + Sync {
    /// Platform name.
    fn platform(&self) -> &str;

    /// Run a forward catch-up pass.
    async fn parse_new_subs(&self, shutdown: &Shutdown) -> Result<SyncOutcome, EngineError>;

    /// Run a backlog crawl.
    async fn parse_backlog(&self, shutdown: &Shutdown) -> Result<SyncOutcome, EngineError>;
}

#[async_trait]
impl<F, C, S> SyncSource for Scraper<F, C, S>
where
    C: Cursor + 'static,
    F: PageFetcher<Offset = C::Offset> + 'static,
    S: SubmissionStore + 'static,
{
    fn platform(&self) -> &str {
        Scraper::platform(self)
    }

    async fn parse_new_subs(&self, shutdown: &Shutdown) -> Result<SyncOutcome, EngineError> {
        Scraper::parse_new_subs(self, shutdown).await
    }

    async fn parse_backlog(&self, shutdown: &Shutdown) -> Result<SyncOutcome, EngineError> {
        Scraper::parse_backlog(self, shutdown).await
    }
}

/// Result of one platform's pass.
#[derive(Debug)]
pub struct SourceReport {
    /// Platform name.
    pub platform: String,
    /// Outcome, or the error that ended the pass.
    pub result: Result<SyncOutcome, EngineError>,
}

impl SourceReport {
    /// Whether the pass ended without error (cancelled passes included).
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Spawns one task per platform and collects their results.
///
/// Tasks share only the shutdown signal. A failing platform is reported and
/// never stops the others.
#[derive(Default)]
pub struct Supervisor {
    sources: Vec<Arc<dyn SyncSource>>,
}

impl Supervisor {
    /// Create an empty supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a platform.
    pub fn add(&mut self, source: Arc<dyn SyncSource>) {
        self.sources.push(source);
    }

    /// Number of registered platforms.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no platform is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run `mode` on every platform concurrently.
    ///
    /// Reports are returned in registration order once every task finished.
    pub async fn run(&self, mode: SyncMode, shutdown: Shutdown) -> Vec<SourceReport> {
        let mut handles = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let source = Arc::clone(source);
            let shutdown = shutdown.clone();
            let platform = source.platform().to_string();
            let handle = tokio::spawn(async move {
                match mode {
                    SyncMode::CatchUp => source.parse_new_subs(&shutdown).await,
                    SyncMode::Backlog => source.parse_backlog(&shutdown).await,
                }
            });
            handles.push((platform, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (platform, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(EngineError::TaskFailed {
                    platform: platform.clone(),
                    reason: e.to_string(),
                }),
            };

            match &result {
                Ok(outcome) => tracing::info!(platform = %platform, "{}", outcome),
                Err(e) => tracing::error!(platform = %platform, "Sync failed: {}", e),
            }
            reports.push(SourceReport { platform, result });
        }

        reports
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let platforms: Vec<&str> = self.sources.iter().map(|s| s.platform()).collect();
        f.debug_struct("Supervisor")
            .field("sources", &platforms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockFetcher;
    use crate::scraper::ScraperOptions;
    use crate::shutdown::shutdown_channel;
    use chrono::{TimeZone, Utc};
    use judge_core::{CountCursor, Termination, TimeCursor};
    use judge_store::SqliteStore;
    use judge_types::{FetchError, Submission};
    use std::time::Duration;

    fn page(ids: &[i64]) -> Vec<Submission> {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ids.iter().map(|&id| Submission::new(id, date)).collect()
    }

    async fn source(platform: &str, fetcher: &MockFetcher<u64>) -> Arc<dyn SyncSource> {
        let store = SqliteStore::in_memory(platform).await.unwrap();
        Arc::new(Scraper::new(
            fetcher.clone(),
            CountCursor,
            store,
            ScraperOptions::default(),
        ))
    }

    #[tokio::test]
    async fn runs_every_source() {
        let a = MockFetcher::new();
        let b = MockFetcher::new();
        a.queue_page(page(&[2, 1]));
        b.queue_page(page(&[1]));

        let mut supervisor = Supervisor::new();
        supervisor.add(source("Infoarena", &a).await);
        supervisor.add(source("Nerdarena", &b).await);
        assert_eq!(supervisor.len(), 2);

        let reports = supervisor.run(SyncMode::CatchUp, Shutdown::never()).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].platform, "Infoarena");
        assert_eq!(reports[0].result.as_ref().unwrap().inserted, 2);
        assert_eq!(reports[1].platform, "Nerdarena");
        assert_eq!(reports[1].result.as_ref().unwrap().inserted, 1);
    }

    #[tokio::test]
    async fn failing_source_does_not_stop_siblings() {
        let broken = MockFetcher::new();
        let healthy = MockFetcher::new();
        broken.queue_error(FetchError::Fatal("HTTP 404".into()));
        healthy.queue_page(page(&[3, 2, 1]));

        let mut supervisor = Supervisor::new();
        supervisor.add(source("Campion", &broken).await);
        supervisor.add(source("Infoarena", &healthy).await);

        let reports = supervisor.run(SyncMode::Backlog, Shutdown::never()).await;

        assert!(!reports[0].is_ok());
        assert_eq!(reports[0].result.as_ref().unwrap_err().platform(), "Campion");
        let outcome = reports[1].result.as_ref().unwrap();
        assert_eq!(outcome.termination, Termination::ReachedEnd);
        assert_eq!(outcome.inserted, 3);
    }

    #[tokio::test]
    async fn mixed_cursor_kinds() {
        let counted = MockFetcher::<u64>::new();
        let timed = MockFetcher::<Option<chrono::DateTime<Utc>>>::new();
        timed.queue_page(page(&[4]));

        let mut supervisor = Supervisor::new();
        supervisor.add(source("Infoarena", &counted).await);
        supervisor.add(Arc::new(Scraper::new(
            timed.clone(),
            TimeCursor,
            SqliteStore::in_memory("CSAcademy").await.unwrap(),
            ScraperOptions::default(),
        )));

        let reports = supervisor.run(SyncMode::Backlog, Shutdown::never()).await;
        assert!(reports.iter().all(SourceReport::is_ok));
        assert_eq!(reports[1].result.as_ref().unwrap().inserted, 1);
    }

    #[tokio::test]
    async fn shutdown_reaches_every_source() {
        let a = MockFetcher::new();
        let b = MockFetcher::new();
        a.hang_when_exhausted();
        b.hang_when_exhausted();

        let mut supervisor = Supervisor::new();
        supervisor.add(source("Infoarena", &a).await);
        supervisor.add(source("Nerdarena", &b).await);

        let (trigger, shutdown) = shutdown_channel();
        let run = tokio::spawn(async move { supervisor.run(SyncMode::Backlog, shutdown).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.trigger();

        let reports = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("supervisor should stop promptly")
            .unwrap();

        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert!(report.result.as_ref().unwrap().is_cancelled());
        }
    }
}
