//! Bounded-concurrency dispatch of a batch of tool calls.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{ApprovalPort, PendingToolCall, ToolContext};
use crate::error::ToolError;
use crate::registry::ToolDefinitionExport;

/// How a single tool call in a batch resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    /// The tool ran and returned output.
    Ok,
    /// Dispatch failed: bad arguments, an unknown tool, or the tool itself errored.
    Error,
    /// The approval port rejected the call before it ran.
    Denied,
    /// The tool's own timeout elapsed.
    Timeout,
}

/// The outcome of dispatching one call from a batch, in the same order the
/// call was submitted.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    /// Echoes [`PendingToolCall::call_id`].
    pub call_id: String,
    /// How the call resolved.
    pub status: ToolStatus,
    /// Tool output on success, or a human-readable failure message otherwise.
    pub output: String,
    /// Machine-readable failure classification (`validation_failed`,
    /// `unknown_tool`, ...), set whenever `status != Ok`.
    pub error_reason: Option<String>,
}

/// A source of tool definitions and a way to invoke them by name.
///
/// Implemented by the built-in registry and by an MCP adapter; multiple
/// ports compose via [`CompositeToolPort`].
#[async_trait]
pub trait ToolPort: Send + Sync {
    /// All tools this port currently exposes.
    async fn get_tool_definitions(&self) -> Vec<ToolDefinitionExport>;

    /// Whether this port can handle `name`.
    async fn has_tool(&self, name: &str) -> bool;

    /// Invoke `name` with already-validated `arguments`.
    async fn call(&self, name: &str, arguments: Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

/// Composes multiple tool ports. Resolution is first-wins by tool name, in
/// the order the ports were added.
pub struct CompositeToolPort {
    ports: Vec<Arc<dyn ToolPort>>,
}

impl CompositeToolPort {
    /// Compose `ports` in priority order (earliest wins on name collision).
    #[must_use]
    pub fn new(ports: Vec<Arc<dyn ToolPort>>) -> Self {
        Self { ports }
    }

    async fn resolve(&self, name: &str) -> Option<&Arc<dyn ToolPort>> {
        for port in &self.ports {
            if port.has_tool(name).await {
                return Some(port);
            }
        }
        None
    }
}

#[async_trait]
impl ToolPort for CompositeToolPort {
    async fn get_tool_definitions(&self) -> Vec<ToolDefinitionExport> {
        let mut seen = std::collections::HashSet::new();
        let mut all = Vec::new();
        for port in &self.ports {
            for def in port.get_tool_definitions().await {
                if seen.insert(def.name.clone()) {
                    all.push(def);
                }
            }
        }
        all
    }

    async fn has_tool(&self, name: &str) -> bool {
        self.resolve(name).await.is_some()
    }

    async fn call(&self, name: &str, arguments: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        match self.resolve(name).await {
            Some(port) => port.call(name, arguments, ctx).await,
            None => Err(ToolError::Other(format!("unknown tool: {name}"))),
        }
    }
}

/// Validate `arguments` against `schema`, returning the failing instance
/// path on the first violation.
fn validate_against_schema(schema: &Value, arguments: &Value) -> Result<(), String> {
    let compiled = match jsonschema::validator_for(schema) {
        Ok(v) => v,
        Err(e) => return Err(format!("invalid schema: {e}")),
    };
    if let Some(error) = compiled.iter_errors(arguments).next() {
        return Err(format!("{} at {}", error, error.instance_path));
    }
    Ok(())
}

/// Execute a batch of tool calls, preserving input order, bounded by
/// `max_concurrency` in-flight calls at a time.
///
/// - Unknown tool names produce `status=error, error_reason="unknown_tool"` without dispatch.
/// - Schema-invalid arguments produce `status=error, error_reason="validation_failed"` without dispatch.
/// - If `require_approval`, each call is gated by `approval` first; denial yields `status=denied`.
/// - A tool's own timeout surfaces as `status=timeout`.
/// - A failing call never aborts the rest of the batch.
pub async fn execute_tool_calls(
    port: &dyn ToolPort,
    approval: &dyn ApprovalPort,
    calls: Vec<PendingToolCall>,
    ctx: &ToolContext,
    max_concurrency: usize,
    require_approval: bool,
) -> Vec<ToolExecutionResult> {
    let definitions = port.get_tool_definitions().await;
    let max_concurrency = max_concurrency.max(1);

    let indexed: Vec<(usize, PendingToolCall)> = calls.into_iter().enumerate().collect();

    let mut results: Vec<(usize, ToolExecutionResult)> = stream::iter(indexed)
        .map(|(idx, call)| {
            let definitions = &definitions;
            async move {
                let result = dispatch_one(port, approval, &call, ctx, definitions, require_approval).await;
                (idx, result)
            }
        })
        .buffer_unordered(max_concurrency)
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, r)| r).collect()
}

async fn dispatch_one(
    port: &dyn ToolPort,
    approval: &dyn ApprovalPort,
    call: &PendingToolCall,
    ctx: &ToolContext,
    definitions: &[ToolDefinitionExport],
    require_approval: bool,
) -> ToolExecutionResult {
    let Some(definition) = definitions.iter().find(|d| d.name == call.name) else {
        warn!(tool = %call.name, call_id = %call.call_id, "unknown tool");
        return ToolExecutionResult {
            call_id: call.call_id.clone(),
            status: ToolStatus::Error,
            output: format!("unknown tool: {}", call.name),
            error_reason: Some("unknown_tool".to_string()),
        };
    };

    if let Err(reason) = validate_against_schema(&definition.parameters, &call.arguments) {
        warn!(tool = %call.name, call_id = %call.call_id, %reason, "tool call failed schema validation");
        return ToolExecutionResult {
            call_id: call.call_id.clone(),
            status: ToolStatus::Error,
            output: format!("Parameter validation failed: {reason}"),
            error_reason: Some("validation_failed".to_string()),
        };
    }

    if require_approval && !approval.approve(call).await {
        warn!(tool = %call.name, call_id = %call.call_id, "tool call denied");
        return ToolExecutionResult {
            call_id: call.call_id.clone(),
            status: ToolStatus::Denied,
            output: format!("tool call to {} was denied", call.name),
            error_reason: Some("denied".to_string()),
        };
    }

    debug!(tool = %call.name, call_id = %call.call_id, "dispatching tool call");

    match port.call(&call.name, call.arguments.clone(), ctx).await {
        Ok(output) => ToolExecutionResult {
            call_id: call.call_id.clone(),
            status: ToolStatus::Ok,
            output,
            error_reason: None,
        },
        Err(ToolError::Timeout(ms)) => ToolExecutionResult {
            call_id: call.call_id.clone(),
            status: ToolStatus::Timeout,
            output: format!("{} timed out after {ms}ms", call.name),
            error_reason: Some("timeout".to_string()),
        },
        Err(e) => ToolExecutionResult {
            call_id: call.call_id.clone(),
            status: ToolStatus::Error,
            output: e.to_string(),
            error_reason: Some("execution_failed".to_string()),
        },
    }
}
