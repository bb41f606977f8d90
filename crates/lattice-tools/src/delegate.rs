//! The `assign_task` delegation tool's contract.
//!
//! Resolving an agent template, enforcing enablement/depth limits, and
//! actually running a child orchestrator all require the orchestrator
//! machinery that lives above this crate; this module defines the seam a
//! runtime implements, plus the `BuiltinTool` wrapper that exposes it.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::registry::BuiltinTool;

/// Result of delegating one task to a sub-agent.
#[derive(Debug, Clone)]
pub struct DelegationOutcome {
    /// The session id the sub-agent ran (or is running) under.
    pub session_id: String,
    /// The sub-agent's final assistant message, or a running/queued notice
    /// for background delegation.
    pub summary: String,
}

/// Runs `assign_task` calls by spawning (or resuming) a child orchestrator.
///
/// Implemented by the runtime crate, which alone knows how to resolve an
/// agent template and construct a child orchestrator from it.
#[async_trait]
pub trait DelegationBackend: Send + Sync {
    /// Delegate `task` to `agent`, optionally resuming `resume`'s session.
    ///
    /// Implementations resolve `agent` against configured templates (if
    /// unknown, the error should list available agent ids), enforce
    /// enablement and max-delegation-depth, and run the child turn to
    /// completion before returning.
    async fn assign_task(
        &self,
        agent: &str,
        task: &str,
        resume: Option<String>,
    ) -> Result<DelegationOutcome, ToolError>;
}

/// The `assign_task` built-in tool.
pub struct AssignTaskTool<B: DelegationBackend> {
    backend: B,
}

impl<B: DelegationBackend> AssignTaskTool<B> {
    /// Wrap a delegation backend as a built-in tool.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: DelegationBackend + 'static> BuiltinTool for AssignTaskTool<B> {
    fn name(&self) -> &'static str {
        "assign_task"
    }

    fn description(&self) -> &'static str {
        "Delegates a task to a named sub-agent, optionally resuming a prior session. \
         Runs in the foreground by default: the call blocks until the sub-agent finishes."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agent": {
                    "type": "string",
                    "description": "Id of the agent template to delegate to"
                },
                "task": {
                    "type": "string",
                    "description": "The task description to hand to the sub-agent"
                },
                "resume": {
                    "type": "string",
                    "description": "A prior session id to resume instead of starting fresh"
                }
            },
            "required": ["agent", "task"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolResult {
        let agent = args
            .get("agent")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("agent is required".into()))?;

        let task = args
            .get("task")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("task is required".into()))?;

        let resume = args.get("resume").and_then(Value::as_str).map(str::to_string);

        let outcome = self.backend.assign_task(agent, task, resume).await?;

        Ok(format!("[session {}]\n{}", outcome.session_id, outcome.summary))
    }
}
