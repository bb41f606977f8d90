//! Lattice Transport — L0 HTTP Transport and L1 Auth Transport.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod auth;
mod error;
mod http;
mod retry;

pub use auth::{AuthTransport, TokenUpdateListener};
pub use error::TransportError;
pub use http::{HttpTransport, Response};
pub use retry::{RetryPolicy, backoff_delay, is_retryable_status};
