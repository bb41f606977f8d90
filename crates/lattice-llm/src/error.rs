//! Error taxonomy for the LLM adapter.

use lattice_core::ErrorKind;
use lattice_transport::TransportError;

/// Errors raised by [`crate::LlmProvider`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The provider returned a response this adapter could not decode.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    /// A requested model is not supported by this provider.
    #[error("model not supported: {0}")]
    UnsupportedModel(String),
    /// The stream ended without a terminal event.
    #[error("stream ended unexpectedly")]
    StreamEndedUnexpectedly,
}

/// Convenience alias for adapter results.
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Classify this error for retry/approval decisions.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Transport(t) => t.kind(),
            LlmError::MalformedResponse(_) => ErrorKind::InvalidRequest,
            LlmError::UnsupportedModel(_) => ErrorKind::ModelUnsupported,
            LlmError::StreamEndedUnexpectedly => ErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_model_maps_to_model_unsupported_kind() {
        let err = LlmError::UnsupportedModel("gpt-9".to_string());
        assert_eq!(err.kind(), ErrorKind::ModelUnsupported);
    }

    #[test]
    fn transport_error_kind_passes_through() {
        let err = LlmError::from(TransportError::Cancelled);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
