//! Retry decisions for failed page fetches.
//!
//! The engine asks [`RetryPolicy::on_fetch_error`] what to do after every
//! failed fetch and sleeps for [`Backoff::delay`] before retrying.

use crate::outcome::SyncMode;
use judge_types::FetchError;
use std::time::Duration;

/// What the engine should do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// Fetch the same offset again after a backoff delay.
    Retry,
    /// Stop the pass cleanly.
    Stop,
    /// Stop the pass and report the error.
    Fail,
}

/// Limits applied by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive shape errors tolerated during a backlog crawl.
    pub max_shape_failures: u32,
    /// Store failures tolerated for one page during catch-up.
    pub max_store_retries: u32,
    /// Consecutive backlog pages that may leave the stored position
    /// unchanged before the crawl fails. 0 keeps retrying until shutdown.
    pub max_stalled_pages: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_shape_failures: 10,
            max_store_retries: 3,
            max_stalled_pages: 0,
        }
    }
}

impl RetryPolicy {
    /// Decide how to react to a fetch error.
    ///
    /// `shape_failures` is the number of consecutive shape errors at the
    /// current offset, including this one.
    pub fn on_fetch_error(
        &self,
        mode: SyncMode,
        error: &FetchError,
        shape_failures: u32,
    ) -> FetchDecision {
        match (mode, error) {
            (_, FetchError::Cancelled) => FetchDecision::Stop,
            (_, e) if !e.is_retryable() => FetchDecision::Fail,
            // Catch-up never loops on fetch errors
            (SyncMode::CatchUp, _) => FetchDecision::Fail,
            (SyncMode::Backlog, FetchError::Shape(_))
                if shape_failures >= self.max_shape_failures =>
            {
                FetchDecision::Fail
            }
            (SyncMode::Backlog, _) => FetchDecision::Retry,
        }
    }
}

/// Exponential backoff with random jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound for the exponential part.
    pub max: Duration,
    /// Upper bound for the random part added on top.
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            jitter: Duration::from_millis(500),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max);

        base + random_jitter(self.jitter)
    }
}

/// Generate random jitter between 0 and `max` inclusive.
fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let mut bytes = [0u8; 8];
    // Fall back to no jitter if the OS RNG is unavailable
    if getrandom::getrandom(&mut bytes).is_err() {
        return Duration::ZERO;
    }
    Duration::from_millis(u64::from_le_bytes(bytes) % (max_ms + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> Backoff {
        Backoff {
            base: Duration::from_millis(100),
            max: Duration::from_secs(1),
            jitter: Duration::ZERO,
        }
    }

    #[test]
    fn cancellation_always_stops() {
        let policy = RetryPolicy::default();
        for mode in [SyncMode::CatchUp, SyncMode::Backlog] {
            assert_eq!(
                policy.on_fetch_error(mode, &FetchError::Cancelled, 0),
                FetchDecision::Stop
            );
        }
    }

    #[test]
    fn fatal_always_fails() {
        let policy = RetryPolicy::default();
        for mode in [SyncMode::CatchUp, SyncMode::Backlog] {
            assert_eq!(
                policy.on_fetch_error(mode, &FetchError::Fatal("404".into()), 0),
                FetchDecision::Fail
            );
        }
    }

    #[test]
    fn catch_up_surfaces_transport_errors() {
        let policy = RetryPolicy::default();
        let err = FetchError::Transport("timeout".into());
        assert_eq!(
            policy.on_fetch_error(SyncMode::CatchUp, &err, 0),
            FetchDecision::Fail
        );
    }

    #[test]
    fn backlog_retries_transport_errors_forever() {
        let policy = RetryPolicy::default();
        let err = FetchError::Transport("timeout".into());
        assert_eq!(
            policy.on_fetch_error(SyncMode::Backlog, &err, u32::MAX),
            FetchDecision::Retry
        );
    }

    #[test]
    fn backlog_gives_up_on_repeated_shape_errors() {
        let policy = RetryPolicy {
            max_shape_failures: 3,
            ..RetryPolicy::default()
        };
        let err = FetchError::Shape("no table".into());

        assert_eq!(
            policy.on_fetch_error(SyncMode::Backlog, &err, 1),
            FetchDecision::Retry
        );
        assert_eq!(
            policy.on_fetch_error(SyncMode::Backlog, &err, 2),
            FetchDecision::Retry
        );
        assert_eq!(
            policy.on_fetch_error(SyncMode::Backlog, &err, 3),
            FetchDecision::Fail
        );
    }

    #[test]
    fn default_policy_never_gives_up_on_stalled_pages() {
        assert_eq!(RetryPolicy::default().max_stalled_pages, 0);
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let backoff = no_jitter();
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
        assert_eq!(backoff.delay(1000), Duration::from_secs(1));
    }

    #[test]
    fn backoff_jitter_is_bounded() {
        let backoff = Backoff {
            jitter: Duration::from_millis(50),
            ..no_jitter()
        };
        for _ in 0..100 {
            let delay = backoff.delay(1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }
}
