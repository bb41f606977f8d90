//! Adapts the MCP tool port so it composes with built-in tools.

use async_trait::async_trait;
use lattice_mcp::McpToolPort;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::execute::ToolPort;
use crate::registry::ToolDefinitionExport;

#[async_trait]
impl ToolPort for McpToolPort {
    async fn get_tool_definitions(&self) -> Vec<ToolDefinitionExport> {
        self.list_tools()
            .await
            .into_iter()
            .map(|t| ToolDefinitionExport {
                name: t.full_name,
                description: t.description.unwrap_or_default(),
                parameters: t.input_schema,
            })
            .collect()
    }

    async fn has_tool(&self, name: &str) -> bool {
        self.has_tool(name).await
    }

    async fn call(&self, name: &str, arguments: Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        let result = self.call_tool(name, arguments).await?;
        if result.is_error {
            Err(ToolError::ExecutionFailed(result.text))
        } else {
            Ok(result.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_mcp_port_has_no_tools() {
        let port: &dyn ToolPort = &McpToolPort::new();
        assert!(port.get_tool_definitions().await.is_empty());
        assert!(!port.has_tool("mcp_fs_read_file").await);
    }
}
