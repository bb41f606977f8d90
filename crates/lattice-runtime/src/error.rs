//! Runtime error taxonomy, wrapping every lower layer this crate calls into.

use lattice_core::ErrorKind;

/// Errors raised while orchestrating a turn or managing its lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The LLM adapter failed.
    #[error(transparent)]
    Llm(#[from] lattice_llm::LlmError),

    /// Tool dispatch failed outside the per-call result (e.g. the tool port
    /// itself could not be reached).
    #[error(transparent)]
    Tool(#[from] lattice_tools::ToolError),

    /// Persisting or loading a snapshot failed.
    #[error(transparent)]
    Storage(#[from] lattice_storage::StorageError),

    /// The `send` call was cancelled before it completed.
    #[error("send was cancelled")]
    Cancelled,

    /// No conversation exists under the given id.
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    /// An internal invariant was violated (never corrupt state, just report).
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl RuntimeError {
    /// Classify this error for propagation/retry decisions.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Llm(e) => e.kind(),
            RuntimeError::Tool(e) => e.kind(),
            RuntimeError::Storage(_) => ErrorKind::InternalInvariant,
            RuntimeError::Cancelled => ErrorKind::Cancelled,
            RuntimeError::UnknownConversation(_) => ErrorKind::InvalidRequest,
            RuntimeError::InternalInvariant(_) => ErrorKind::InternalInvariant,
        }
    }
}

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_not_retryable() {
        assert_eq!(RuntimeError::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(!RuntimeError::Cancelled.kind().is_retryable());
    }
}
