//! Error types for judge-engine.

use judge_core::FurthestPosition;
use judge_store::StorageError;
use judge_types::FetchError;

/// Errors that end a sync pass for one platform.
///
/// Cancellation is never reported through this type; a cancelled pass
/// returns a successful outcome.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A page fetch failed and the retry policy gave up.
    #[error("{platform}: fetch failed: {source}")]
    Fetch {
        /// Platform name.
        platform: String,
        /// The last fetch error.
        source: FetchError,
    },

    /// The store failed and the retry policy gave up.
    #[error("{platform}: storage failed: {source}")]
    Store {
        /// Platform name.
        platform: String,
        /// The last storage error.
        source: StorageError,
    },

    /// The store returned a position the cursor cannot resume from.
    #[error("{platform}: stored position {position:?} does not fit the cursor")]
    PositionMismatch {
        /// Platform name.
        platform: String,
        /// The position the store returned.
        position: FurthestPosition,
    },

    /// Backlog pages kept leaving the stored position unchanged past the
    /// configured limit.
    #[error("{platform}: backlog stuck at offset {offset} after {pages} pages without progress")]
    Stalled {
        /// Platform name.
        platform: String,
        /// The offset that kept being refetched.
        offset: String,
        /// Consecutive pages that did not move the position.
        pages: u32,
    },

    /// The task running the platform panicked or was aborted.
    #[error("{platform}: sync task failed: {reason}")]
    TaskFailed {
        /// Platform name.
        platform: String,
        /// Panic or abort description.
        reason: String,
    },
}

impl EngineError {
    /// The platform the error belongs to.
    pub fn platform(&self) -> &str {
        match self {
            Self::Fetch { platform, .. }
            | Self::Store { platform, .. }
            | Self::PositionMismatch { platform, .. }
            | Self::Stalled { platform, .. }
            | Self::TaskFailed { platform, .. } => platform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_platform() {
        let err = EngineError::Fetch {
            platform: "CSAcademy".into(),
            source: FetchError::Fatal("HTTP 404".into()),
        };
        assert_eq!(
            err.to_string(),
            "CSAcademy: fetch failed: fatal fetch error: HTTP 404"
        );
        assert_eq!(err.platform(), "CSAcademy");
    }

    #[test]
    fn stalled_error_names_offset() {
        let err = EngineError::Stalled {
            platform: "Infoarena".into(),
            offset: "200".into(),
            pages: 5,
        };
        assert_eq!(
            err.to_string(),
            "Infoarena: backlog stuck at offset 200 after 5 pages without progress"
        );
        assert_eq!(err.platform(), "Infoarena");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
