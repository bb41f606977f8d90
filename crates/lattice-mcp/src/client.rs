//! Connects to configured MCP servers over stdio and exposes their tools
//! under a prefix.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::ServiceExt;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{McpError, McpResult};
use crate::types::{McpToolDefinition, McpToolResult};

struct ConnectedServer {
    peer: RunningService<RoleClient, ()>,
    prefix: String,
}

/// The L4b MCP tool port: one instance manages zero or more connected
/// servers and resolves prefixed tool names back to the owning server.
pub struct McpToolPort {
    servers: RwLock<HashMap<String, ConnectedServer>>,
    tools: RwLock<Vec<McpToolDefinition>>,
}

impl McpToolPort {
    /// Build an empty port with no connected servers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Spawn and connect to a server, then refresh the cached tool list.
    pub async fn connect(&self, config: &ServerConfig) -> McpResult<()> {
        let command = Command::new(&config.command).configure(|cmd| {
            cmd.args(&config.args);
            for (key, value) in &config.env {
                cmd.env(key, value);
            }
            if let Some(cwd) = &config.cwd {
                cmd.current_dir(cwd);
            }
        });

        let transport = TokioChildProcess::new(command).map_err(|e| McpError::ConnectFailed {
            server: config.name.clone(),
            reason: e.to_string(),
        })?;

        let peer = ().serve(transport).await.map_err(|e| McpError::ConnectFailed {
            server: config.name.clone(),
            reason: e.to_string(),
        })?;

        info!(server = %config.name, "mcp server connected");

        {
            let mut servers = self.servers.write().await;
            servers.insert(
                config.name.clone(),
                ConnectedServer {
                    peer,
                    prefix: config.tool_prefix(),
                },
            );
        }

        self.refresh_tools().await
    }

    /// Disconnect a server and drop its tools from the cache.
    pub async fn disconnect(&self, server: &str) -> McpResult<()> {
        {
            let mut servers = self.servers.write().await;
            servers.remove(server);
        }
        self.refresh_tools().await
    }

    /// Disconnect every connected server.
    pub async fn disconnect_all(&self) {
        let mut servers = self.servers.write().await;
        servers.clear();
        drop(servers);
        self.tools.write().await.clear();
    }

    async fn refresh_tools(&self) -> McpResult<()> {
        let servers = self.servers.read().await;
        let mut all = Vec::new();
        for (name, connected) in servers.iter() {
            match connected.peer.list_all_tools().await {
                Ok(tools) => {
                    for tool in &tools {
                        all.push(McpToolDefinition::from_rmcp(tool, name, &connected.prefix));
                    }
                },
                Err(e) => {
                    warn!(server = %name, error = %e, "failed to list tools");
                },
            }
        }
        *self.tools.write().await = all;
        Ok(())
    }

    /// All tools currently exposed by connected servers, already prefixed.
    pub async fn list_tools(&self) -> Vec<McpToolDefinition> {
        self.tools.read().await.clone()
    }

    /// Whether `full_name` (e.g. `mcp_fs_read_file`) is a tool this port exposes.
    pub async fn has_tool(&self, full_name: &str) -> bool {
        self.tools.read().await.iter().any(|t| t.full_name == full_name)
    }

    /// Call a prefixed tool, routing to its owning server.
    pub async fn call_tool(&self, full_name: &str, arguments: Value) -> McpResult<McpToolResult> {
        let definition = {
            let tools = self.tools.read().await;
            tools
                .iter()
                .find(|t| t.full_name == full_name)
                .cloned()
                .ok_or_else(|| McpError::UnknownTool(full_name.to_string()))?
        };

        let servers = self.servers.read().await;
        let connected = servers
            .get(&definition.server)
            .ok_or_else(|| McpError::ServerNotConnected(definition.server.clone()))?;

        debug!(server = %definition.server, tool = %definition.tool_name, "calling mcp tool");

        let args_map = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                Some(map)
            },
        };

        let result = connected
            .peer
            .call_tool(CallToolRequestParam {
                name: definition.tool_name.clone().into(),
                arguments: args_map,
            })
            .await
            .map_err(|e| McpError::ToolCallFailed {
                server: definition.server.clone(),
                tool: definition.tool_name.clone(),
                reason: e.to_string(),
            })?;

        Ok(McpToolResult::from(result))
    }
}

impl Default for McpToolPort {
    fn default() -> Self {
        Self::new()
    }
}
