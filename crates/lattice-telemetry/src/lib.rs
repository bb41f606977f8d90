#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Logging setup and request-correlation spans shared across every layer of
//! the orchestrator.
//!
//! ```rust,no_run
//! use lattice_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), lattice_telemetry::TelemetryError> {
//! setup_logging(&LogConfig::new("debug").with_format(LogFormat::Pretty))?;
//! tracing::info!("logging initialized");
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
