#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! The tool port: JSON-Schema-validated, bounded-concurrency dispatch of
//! tool calls across built-in, MCP-backed, and delegation tools.

mod context;
mod delegate;
mod error;
mod execute;
mod mcp_adapter;
mod registry;
mod tools;

pub use context::{ApprovalPort, AutoApprove, PendingToolCall, ToolContext};
pub use delegate::{AssignTaskTool, DelegationBackend, DelegationOutcome};
pub use error::{ToolError, ToolResult};
pub use execute::{execute_tool_calls, CompositeToolPort, ToolExecutionResult, ToolPort, ToolStatus};
pub use registry::{truncate_output, BuiltinTool, ToolDefinitionExport, ToolRegistry};
pub use tools::{BashTool, EditFileTool, GlobTool, GrepTool, ReadFileTool, WriteFileTool};
