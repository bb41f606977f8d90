//! Shared context and approval gating available to tool execution.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// One tool call as resolved from an LLM response, ready for dispatch.
#[derive(Debug, Clone)]
pub struct PendingToolCall {
    /// The id the LLM assigned this call, echoed back in the result.
    pub call_id: String,
    /// The tool name (builtin, `mcp_<server>_<tool>`, or `assign_task`).
    pub name: String,
    /// Already-parsed arguments.
    pub arguments: Value,
}

/// Decides whether a tool invocation may proceed.
#[async_trait]
pub trait ApprovalPort: Send + Sync {
    /// Return `true` to allow `call` to run, `false` to deny it.
    async fn approve(&self, call: &PendingToolCall) -> bool;
}

/// Approves every call unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalPort for AutoApprove {
    async fn approve(&self, _call: &PendingToolCall) -> bool {
        true
    }
}

/// Shared context available to all built-in tools during one conversation.
pub struct ToolContext {
    /// Workspace root directory.
    pub workspace_root: PathBuf,
    /// Current working directory, persisted across `bash` invocations.
    pub cwd: Arc<RwLock<PathBuf>>,
}

impl ToolContext {
    /// Create a new tool context rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: PathBuf) -> Self {
        let cwd = Arc::new(RwLock::new(workspace_root.clone()));
        Self { workspace_root, cwd }
    }

    /// Create a context that shares its `cwd` cell with another (e.g. a
    /// delegated sub-agent inheriting the parent's working directory).
    #[must_use]
    pub fn with_shared_cwd(workspace_root: PathBuf, cwd: Arc<RwLock<PathBuf>>) -> Self {
        Self { workspace_root, cwd }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auto_approve_always_allows() {
        let call = PendingToolCall {
            call_id: "c1".into(),
            name: "bash".into(),
            arguments: serde_json::json!({}),
        };
        assert!(AutoApprove.approve(&call).await);
    }
}
