//! Errors raised while configuring or initializing logging.

use lattice_core::ErrorKind;
use thiserror::Error;

/// Errors from telemetry setup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The supplied `LogConfig` could not be turned into a filter or layer.
    #[error("invalid logging configuration: {0}")]
    Config(String),

    /// The global subscriber could not be installed (usually because one
    /// was already installed).
    #[error("failed to initialize logging: {0}")]
    Init(String),

    /// Creating the log directory or file failed.
    #[error("logging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelemetryError {
    /// Classify this error into the cross-cutting taxonomy.
    ///
    /// Logging setup failures are startup-time invariant violations: they
    /// are never retried and never surfaced to an LLM as tool feedback.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InternalInvariant
    }
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_is_an_internal_invariant() {
        assert_eq!(TelemetryError::Config("x".into()).kind(), ErrorKind::InternalInvariant);
        assert_eq!(TelemetryError::Init("x".into()).kind(), ErrorKind::InternalInvariant);
    }
}
