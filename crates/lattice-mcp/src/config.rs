//! MCP server connection configuration.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How to reach one MCP server (stdio child process only; subprocess
/// lifecycle details beyond spawning are out of scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name, used to build the tool prefix (`mcp_<name>_<tool>`).
    pub name: String,
    /// Command to spawn.
    pub command: String,
    /// Arguments for the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables for the child process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,
}

impl ServerConfig {
    /// Build a stdio server config.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The tool-name prefix this server's tools are exposed under.
    #[must_use]
    pub fn tool_prefix(&self) -> String {
        format!("mcp_{}_", self.name)
    }
}
