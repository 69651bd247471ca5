//! Mock fetcher for testing.
//!
//! Allows scripting pages and errors and capturing requested offsets for
//! verification.

use super::PageFetcher;
use async_trait::async_trait;
use judge_types::{FetchError, Submission};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock page fetcher for testing.
///
/// Scripted responses are returned in order, one per `fetch()` call. Once
/// the script runs out, every call returns an empty page unless
/// [`MockFetcher::fail_when_exhausted`] or
/// [`MockFetcher::hang_when_exhausted`] says otherwise.
///
/// Clones share their script and call log.
pub struct MockFetcher<O> {
    inner: Arc<Mutex<MockFetcherInner<O>>>,
}

struct MockFetcherInner<O> {
    script: VecDeque<Result<Vec<Submission>, FetchError>>,
    exhausted: Exhausted,
    requested: Vec<O>,
}

#[derive(Debug, Clone)]
enum Exhausted {
    Empty,
    Fail(FetchError),
    Hang,
}

impl<O> Default for MockFetcher<O> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockFetcherInner {
                script: VecDeque::new(),
                exhausted: Exhausted::Empty,
                requested: Vec::new(),
            })),
        }
    }
}

impl<O> MockFetcher<O> {
    /// Create a new mock fetcher with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockFetcherInner<O>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a page to be returned by the next unscripted `fetch()` call.
    pub fn queue_page(&self, page: Vec<Submission>) {
        self.lock().script.push_back(Ok(page));
    }

    /// Queue an error to be returned by the next unscripted `fetch()` call.
    pub fn queue_error(&self, error: FetchError) {
        self.lock().script.push_back(Err(error));
    }

    /// Return `error` from every call after the script runs out.
    pub fn fail_when_exhausted(&self, error: FetchError) {
        self.lock().exhausted = Exhausted::Fail(error);
    }

    /// Never complete any call made after the script runs out.
    pub fn hang_when_exhausted(&self) {
        self.lock().exhausted = Exhausted::Hang;
    }

    /// Number of `fetch()` calls made so far.
    pub fn calls(&self) -> usize {
        self.lock().requested.len()
    }
}

impl<O: Clone> MockFetcher<O> {
    /// Offsets passed to `fetch()`, in call order.
    pub fn requested_offsets(&self) -> Vec<O> {
        self.lock().requested.clone()
    }
}

impl<O> Clone for MockFetcher<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O> fmt::Debug for MockFetcher<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockFetcher")
            .field("scripted", &inner.script.len())
            .field("calls", &inner.requested.len())
            .field("exhausted", &inner.exhausted)
            .finish()
    }
}

#[async_trait]
impl<O> PageFetcher for MockFetcher<O>
where
    O: Clone + Send + Sync + 'static,
{
    type Offset = O;

    async fn fetch(&self, offset: &O) -> Result<Vec<Submission>, FetchError> {
        let next = {
            let mut inner = self.lock();
            inner.requested.push(offset.clone());
            match inner.script.pop_front() {
                Some(response) => Ok(response),
                None => Err(inner.exhausted.clone()),
            }
        };

        match next {
            Ok(response) => response,
            Err(Exhausted::Empty) => Ok(Vec::new()),
            Err(Exhausted::Fail(error)) => Err(error),
            Err(Exhausted::Hang) => std::future::pending().await,
        }
    }
}
