//! Error types for judge-store.

use std::path::PathBuf;

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored date could not be parsed.
    #[error("invalid stored timestamp: {value}")]
    InvalidTimestamp {
        /// The raw column value.
        value: String,
    },

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::InvalidTimestamp {
            value: "yesterday".into(),
        };
        assert_eq!(err.to_string(), "invalid stored timestamp: yesterday");

        let err = StorageError::InvalidPath {
            path: PathBuf::from("/nope"),
        };
        assert_eq!(err.to_string(), "invalid database path: /nope");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StorageError>();
    }
}
