//! Tool execution error taxonomy.

use lattice_core::ErrorKind;

/// Errors a built-in tool's `execute` can return.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arguments failed a tool-local check (distinct from schema validation,
    /// which runs before the tool is invoked at all).
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran but failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A referenced path does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The tool's own timeout elapsed.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Delegation-specific failure (unknown agent, depth exceeded, disabled).
    #[error("{0}")]
    Delegation(String),

    /// Routed through an MCP tool port.
    #[error(transparent)]
    Mcp(#[from] lattice_mcp::McpError),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Result type for tool execution.
pub type ToolResult = Result<String, ToolError>;

impl ToolError {
    /// Classify this error for propagation/retry decisions.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Io(_) | ToolError::ExecutionFailed(_) | ToolError::Other(_) => {
                ErrorKind::ToolError
            },
            ToolError::InvalidArguments(_) => ErrorKind::ValidationFailed,
            ToolError::PathNotFound(_) => ErrorKind::ToolError,
            ToolError::Timeout(_) => ErrorKind::ToolTimeout,
            ToolError::Delegation(_) => ErrorKind::ToolError,
            ToolError::Mcp(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_arguments_maps_to_validation_failed() {
        let err = ToolError::InvalidArguments("command is required".into());
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn timeout_maps_to_tool_timeout() {
        let err = ToolError::Timeout(5000);
        assert_eq!(err.kind(), ErrorKind::ToolTimeout);
    }
}
