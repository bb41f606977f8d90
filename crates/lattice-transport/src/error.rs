//! Transport-layer errors.

use lattice_core::ErrorKind;

/// Errors raised by [`crate::HttpTransport`] and [`crate::AuthTransport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The caller's cancellation signal fired mid-request.
    #[error("request cancelled")]
    Cancelled,

    /// The request was never sent or the connection failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server responded with a non-2xx status.
    #[error("http {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated if large).
        body: String,
        /// `Retry-After`, normalized to seconds, if present.
        retry_after_secs: Option<u64>,
    },

    /// OAuth token refresh failed; no further retries are attempted.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

impl TransportError {
    /// Classify this error into the cross-cutting taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Cancelled => ErrorKind::Cancelled,
            TransportError::Network(_) => ErrorKind::Network,
            TransportError::RefreshFailed(_) => ErrorKind::AuthRefreshFailed,
            TransportError::Status { status, .. } => match *status {
                401 | 403 => ErrorKind::Authentication,
                400 => ErrorKind::InvalidRequest,
                429 => ErrorKind::RateLimited,
                408 | 425 | 500 | 502 | 503 | 504 => ErrorKind::TemporaryUnavailable,
                _ => ErrorKind::Unknown,
            },
        }
    }

    /// Seconds to wait before retrying, if known.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            TransportError::Status {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Whether a retry wrapper should attempt this request again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
