//! DTOs bridging `rmcp`'s wire types to the tool port's contract.

use rmcp::model::{self as rmcp_model, RawContent};
use serde_json::Value;

/// A tool exposed by a connected MCP server, already prefixed.
#[derive(Debug, Clone)]
pub struct McpToolDefinition {
    /// Prefixed name (e.g. `mcp_fs_read_file`).
    pub full_name: String,
    /// The server it came from.
    pub server: String,
    /// The tool's own name on that server.
    pub tool_name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON Schema for the tool's input.
    pub input_schema: Value,
}

impl McpToolDefinition {
    /// Build from an `rmcp` tool listing entry.
    #[must_use]
    pub fn from_rmcp(tool: &rmcp_model::Tool, server: &str, prefix: &str) -> Self {
        Self {
            full_name: format!("{prefix}{}", tool.name),
            server: server.to_string(),
            tool_name: tool.name.to_string(),
            description: tool.description.as_deref().map(String::from),
            input_schema: serde_json::to_value(&*tool.input_schema)
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }
}

/// The result of calling an MCP tool, already flattened to text.
#[derive(Debug, Clone)]
pub struct McpToolResult {
    /// Concatenated text content of the result.
    pub text: String,
    /// Whether the server reported this call as an error.
    pub is_error: bool,
}

impl From<rmcp_model::CallToolResult> for McpToolResult {
    fn from(result: rmcp_model::CallToolResult) -> Self {
        let is_error = result.is_error.unwrap_or(false);
        let text = result
            .content
            .iter()
            .filter_map(|c| match &**c {
                RawContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, is_error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_from_empty_content_is_empty_text() {
        let result = McpToolResult {
            text: String::new(),
            is_error: false,
        };
        assert!(result.text.is_empty());
        assert!(!result.is_error);
    }
}
