//! Cross-cutting error taxonomy.
//!
//! Individual layers (`lattice-llm`, `lattice-mcp`, `lattice-tools`, ...)
//! define their own `thiserror` enums for layer-specific detail; each one
//! exposes a `kind()` that maps into [`ErrorKind`] so the orchestrator can
//! apply one propagation policy regardless of which layer raised the error.

use serde::{Deserialize, Serialize};

/// Taxonomy of error kinds, not type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// 401/403, non-retryable.
    Authentication,
    /// 400, non-retryable.
    InvalidRequest,
    /// 429, retryable, honoring `Retry-After`.
    RateLimited,
    /// 5xx, retryable.
    TemporaryUnavailable,
    /// I/O failure, retryable.
    Network,
    /// Abort signal observed, non-retryable.
    Cancelled,
    /// Tool parameters failed JSON-Schema validation.
    ValidationFailed,
    /// A tool call failed during execution.
    ToolError,
    /// A tool call exceeded its timeout.
    ToolTimeout,
    /// A tool call was denied by the approval port.
    ToolDenied,
    /// The requested tool name has no registered implementation.
    UnknownTool,
    /// The provider rejected the model as unsupported.
    ModelUnsupported,
    /// OAuth token refresh failed.
    AuthRefreshFailed,
    /// An internal invariant was violated; never corrupt state, just report.
    InternalInvariant,
    /// Unclassified.
    Unknown,
}

impl ErrorKind {
    /// Whether a transport-level wrapper should retry an error of this kind.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::TemporaryUnavailable | ErrorKind::Network
        )
    }

    /// Whether this error kind is fed back to the LLM as a tool-role message
    /// rather than surfaced as a fatal `Error` event.
    #[must_use]
    pub fn is_tool_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationFailed
                | ErrorKind::ToolError
                | ErrorKind::ToolTimeout
                | ErrorKind::ToolDenied
                | ErrorKind::UnknownTool
        )
    }
}

/// A generic error carrying an [`ErrorKind`], used at crate boundaries where
/// a specific layer error has already been classified.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct LatticeError {
    /// The classified kind.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Seconds to wait before retrying, if the server specified one.
    pub retry_after_secs: Option<u64>,
}

impl LatticeError {
    /// Construct a new classified error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Attach a `Retry-After` hint.
    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::TemporaryUnavailable.is_retryable());
        assert!(ErrorKind::Network.is_retryable());
        assert!(!ErrorKind::Authentication.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }

    #[test]
    fn tool_recoverable_kinds() {
        assert!(ErrorKind::ValidationFailed.is_tool_recoverable());
        assert!(ErrorKind::UnknownTool.is_tool_recoverable());
        assert!(!ErrorKind::Authentication.is_tool_recoverable());
    }
}
