//! Lattice Events — the outbound event port.
//!
//! Events are published to an [`EventBus`] which broadcasts them to all
//! subscribers via `tokio::sync::broadcast`. One `send` call's events are
//! emitted in monotonic wall-clock order; cross-session ordering is not
//! guaranteed.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod bus;
mod event;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{Event, EventEnvelope, ToolStatus};
