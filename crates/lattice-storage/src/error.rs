//! Storage error types.

use lattice_core::ErrorKind;

/// Errors from snapshot and event-log persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The snapshot file does not exist yet.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading, writing, or renaming a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk JSON did not match the expected shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The given path or key is not valid for this store.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Classify this error into the cross-cutting taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) | StorageError::InvalidPath(_) => ErrorKind::InvalidRequest,
            StorageError::Io(_) => ErrorKind::Network,
            StorageError::Serialization(_) => ErrorKind::InternalInvariant,
        }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified_as_network_for_retry() {
        let err = StorageError::Io(std::io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn not_found_is_not_retryable() {
        assert_eq!(StorageError::NotFound("x".into()).kind(), ErrorKind::InvalidRequest);
    }
}
