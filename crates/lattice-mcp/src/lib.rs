//! MCP Tool Port: adapts remote MCP server tools under a configured prefix.
//!
//! Subprocess lifecycle management (restart policy, binary verification,
//! auto-start) is treated as an external concern; this crate connects a
//! configured server once and exposes its tools, nothing more.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod client;
mod config;
mod error;
mod types;

pub use client::McpToolPort;
pub use config::ServerConfig;
pub use error::{McpError, McpResult};
pub use types::{McpToolDefinition, McpToolResult};
