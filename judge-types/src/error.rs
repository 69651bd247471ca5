//! Error types for page fetchers.

use thiserror::Error;

/// Errors a page fetcher can report for a single page request.
///
/// The variant decides how the sync engine reacts: transport and shape
/// failures are retried at the same offset, cancellation ends the loop
/// cleanly, fatal failures end it with an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The page did not have the expected structure.
    #[error("unexpected page shape: {0}")]
    Shape(String),

    /// The request was abandoned because shutdown was requested.
    #[error("fetch cancelled")]
    Cancelled,

    /// The request can never succeed (bad endpoint, rejected request).
    #[error("fatal fetch error: {0}")]
    Fatal(String),
}

impl FetchError {
    /// Whether the same request may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Shape(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FetchError::Shape("missing table".into());
        assert_eq!(err.to_string(), "unexpected page shape: missing table");
    }

    #[test]
    fn retryable_kinds() {
        assert!(FetchError::Transport("reset".into()).is_retryable());
        assert!(FetchError::Shape("bad".into()).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::Fatal("404".into()).is_retryable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FetchError>();
    }
}
