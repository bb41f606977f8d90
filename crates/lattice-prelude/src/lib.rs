//! Unified prelude for the lattice agent orchestrator.
//!
//! This crate provides a single import bringing in the commonly used types
//! from across the workspace: core identifiers and environment facts, the
//! event bus, the LLM adapter contract, MCP client, tool execution, approval
//! ports, configuration, telemetry, durable storage, and the orchestrator
//! runtime itself.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lattice_prelude::*;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub use lattice_approval::*;
pub use lattice_config::*;
pub use lattice_core::*;
pub use lattice_events::*;
pub use lattice_llm::*;
pub use lattice_mcp::*;
pub use lattice_runtime::*;
pub use lattice_storage::*;
pub use lattice_telemetry::*;
pub use lattice_tools::*;
pub use lattice_transport::*;
