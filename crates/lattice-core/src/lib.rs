//! Lattice Core — shared identifiers, error taxonomy, and runtime environment.
//!
//! This crate has no dependency on any other `lattice-*` crate. Every other
//! crate in the workspace depends on it for ids and the common error kind.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod env;
mod error;
mod ids;
mod usage;

pub use env::RuntimeEnv;
pub use error::{ErrorKind, LatticeError};
pub use ids::{ConversationId, SessionId, ToolCallId};
pub use usage::Usage;
