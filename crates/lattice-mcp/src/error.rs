//! MCP error taxonomy.

use lattice_core::ErrorKind;

/// Errors raised while connecting to or calling an MCP server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// The named server has no active connection.
    #[error("mcp server not connected: {0}")]
    ServerNotConnected(String),
    /// Connecting to the server failed.
    #[error("failed to connect to mcp server {server}: {reason}")]
    ConnectFailed {
        /// Server name.
        server: String,
        /// Underlying failure reason.
        reason: String,
    },
    /// The tool call itself failed or the server returned an error result.
    #[error("tool call failed: {server}:{tool}: {reason}")]
    ToolCallFailed {
        /// Server name.
        server: String,
        /// Tool name within that server.
        tool: String,
        /// Underlying failure reason.
        reason: String,
    },
    /// No tool with this full (prefixed) name is known.
    #[error("unknown mcp tool: {0}")]
    UnknownTool(String),
}

/// Convenience alias for MCP results.
pub type McpResult<T> = Result<T, McpError>;

impl McpError {
    /// Classify this error for retry/approval decisions.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            McpError::ServerNotConnected(_) | McpError::ConnectFailed { .. } => {
                ErrorKind::TemporaryUnavailable
            },
            McpError::ToolCallFailed { .. } => ErrorKind::ToolError,
            McpError::UnknownTool(_) => ErrorKind::UnknownTool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_maps_to_unknown_tool_kind() {
        let err = McpError::UnknownTool("mcp_fs_read".to_string());
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
    }
}
