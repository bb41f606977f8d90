//! The in-process `BuiltinTool` trait and a registry of such tools.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::execute::ToolPort;
use crate::tools::{BashTool, EditFileTool, GlobTool, GrepTool, ReadFileTool, WriteFileTool};

/// Maximum output size in characters before truncation.
const MAX_OUTPUT_CHARS: usize = 30_000;

/// A tool that executes directly in-process (as opposed to one routed
/// through an MCP server).
#[async_trait]
pub trait BuiltinTool: Send + Sync {
    /// Tool name. No colons — that distinguishes built-ins from
    /// MCP-exposed tools (`mcp_<server>_<tool>`).
    fn name(&self) -> &'static str;

    /// Human-readable description shown to the LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for this tool's input parameters.
    fn input_schema(&self) -> Value;

    /// Run the tool. Arguments have already passed schema validation.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult;
}

/// One exported tool definition, in the shape an LLM provider expects.
#[derive(Debug, Clone)]
pub struct ToolDefinitionExport {
    /// Tool name.
    pub name: String,
    /// Description.
    pub description: String,
    /// JSON Schema for parameters.
    pub parameters: Value,
}

/// Registry of built-in tools for lookup and export.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn BuiltinTool>>,
}

impl ToolRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// A registry with the standard coding tools registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ReadFileTool));
        registry.register(Box::new(WriteFileTool));
        registry.register(Box::new(EditFileTool));
        registry.register(Box::new(GlobTool));
        registry.register(Box::new(GrepTool));
        registry.register(Box::new(BashTool));
        registry
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: Box<dyn BuiltinTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BuiltinTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// A name refers to a built-in (as opposed to an MCP-exposed tool) when
    /// it carries no colon and no `mcp_` prefix.
    #[must_use]
    pub fn is_builtin(name: &str) -> bool {
        !name.contains(':') && !name.starts_with("mcp_")
    }

    /// Export every registered tool's definition.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<ToolDefinitionExport> {
        self.tools
            .values()
            .map(|t| ToolDefinitionExport {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.input_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolPort for ToolRegistry {
    async fn get_tool_definitions(&self) -> Vec<ToolDefinitionExport> {
        self.all_definitions()
    }

    async fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    async fn call(&self, name: &str, arguments: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        match self.get(name) {
            Some(tool) => tool.execute(arguments, ctx).await,
            None => Err(ToolError::Other(format!("unknown tool: {name}"))),
        }
    }
}

/// Truncate output to stay within LLM context limits, appending a notice
/// when truncation occurs.
#[must_use]
pub fn truncate_output(output: String) -> String {
    if output.len() <= MAX_OUTPUT_CHARS {
        return output;
    }
    let mut truncated = output[..MAX_OUTPUT_CHARS].to_string();
    truncated.push_str("\n\n... (output truncated — exceeded 30000 character limit)");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_builtin_excludes_mcp_and_colon_names() {
        assert!(ToolRegistry::is_builtin("read_file"));
        assert!(ToolRegistry::is_builtin("bash"));
        assert!(!ToolRegistry::is_builtin("filesystem:read_file"));
        assert!(!ToolRegistry::is_builtin("mcp_fs_read_file"));
    }

    #[test]
    fn with_defaults_registers_six_tools() {
        let registry = ToolRegistry::with_defaults();
        let defs = registry.all_definitions();
        assert_eq!(defs.len(), 6);
        for def in &defs {
            assert!(!def.name.contains(':'));
        }
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn truncate_output_passes_small_strings_through() {
        let small = "hello".to_string();
        assert_eq!(truncate_output(small.clone()), small);
    }

    #[test]
    fn truncate_output_appends_notice_when_oversized() {
        let large = "x".repeat(40_000);
        let result = truncate_output(large);
        assert!(result.len() < 40_000);
        assert!(result.contains("output truncated"));
    }
}
