#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Durable persistence for conversation snapshots and event logs.
//!
//! This crate knows nothing about `Message` or `Event` shapes — it is the
//! file-level mechanism (`history.json`/`events.json`) that
//! `lattice-runtime`'s conversation store and event bus build on when
//! persistence is enabled.

mod error;
mod event_log;
mod snapshot;

pub use error::{StorageError, StorageResult};
pub use event_log::EventLog;
pub use snapshot::{read_snapshot, read_snapshot_or_default, write_snapshot_atomic};
