//! Tagged event variants emitted to the event port.

use lattice_core::Usage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a tool execution, as surfaced on the event port and in
/// `ToolExecutionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// The tool ran and returned successfully.
    Success,
    /// The tool ran and raised an error.
    Error,
    /// The tool exceeded its timeout.
    Timeout,
    /// The `send` was cancelled while the tool was pending.
    Cancelled,
    /// The approval port denied the call.
    Denied,
}

/// One tagged event on the outbound port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The user message that started this turn.
    UserMessage {
        /// Message text.
        content: String,
        /// Free-form metadata (e.g. attachments), opaque to the core.
        metadata: Value,
    },
    /// A streaming content fragment.
    AssistantChunk {
        /// The fragment of assistant text.
        delta: String,
        /// Usage observed alongside this chunk, if any.
        usage: Option<Usage>,
    },
    /// A complete assistant message (non-streaming, or the final streamed result).
    AssistantMessage {
        /// Full assistant text.
        content: String,
        /// Tool calls the assistant requested, if any.
        tool_calls: Option<Vec<ToolCallSummary>>,
        /// Usage for this completion.
        usage: Option<Usage>,
    },
    /// A tool call is about to be dispatched.
    ToolCallStart {
        /// The tool call id.
        id: String,
        /// The tool name (builtin, `mcp_<server>_<tool>`, or `assign_task`).
        name: String,
        /// Decoded parameters.
        parameters: Value,
    },
    /// A tool call finished (successfully or not).
    ToolCallResult {
        /// The tool call id, matching the corresponding `ToolCallStart`.
        id: String,
        /// The tool name.
        name: String,
        /// Outcome.
        status: ToolStatus,
        /// Result text or structured payload.
        result: Value,
        /// Wall-clock duration of the call.
        duration_ms: u64,
    },
    /// The LLM adapter finished one streaming round.
    StreamFinish {
        /// The provider's finish reason, if reported.
        finish_reason: Option<String>,
        /// Usage for the round.
        usage: Option<Usage>,
    },
    /// The `send` call is complete.
    Done {
        /// Final usage for the turn, if any LLM call was made.
        usage: Option<Usage>,
    },
    /// A non-fatal, user-visible notice (retry attempts, auto-summary, warnings).
    System {
        /// Notice text.
        content: String,
        /// Optional UI color hint.
        color: Option<String>,
    },
    /// A fatal error terminating the `send` call.
    Error {
        /// Human-readable message.
        message: String,
    },
    /// UI control: clear previously rendered lines (emitted around auto-summary).
    LinesClear,
    /// UI control: refresh the header/status bar (emitted around auto-summary).
    HeaderRefresh,
}

/// A tool call as summarized on the `AssistantMessage` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallSummary {
    /// Tool call id, unique within the response.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Serialized JSON arguments text.
    pub arguments: String,
}

/// An event together with its monotonically assigned sequence id and
/// timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotonically increasing sequence number, scoped to one [`EventBus`].
    pub seq: u64,
    /// Wall-clock time the event was published.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// The event payload.
    pub event: Event,
}
