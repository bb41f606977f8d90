//! The Agent Orchestrator (L6): drives one `send` call end to end —
//! assembling messages, streaming the LLM response, dispatching any tool
//! calls it requests, and looping until the model stops calling tools.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use lattice_config::AgentConfig;
use lattice_core::{ConversationId, RuntimeEnv, SessionId, Usage};
use lattice_events::{Event, EventBus, ToolCallSummary, ToolStatus as EventToolStatus};
use lattice_llm::{
    CompletionParams, LlmProvider, Message, StopReason, StreamEvent, ToolCall as LlmToolCall, ToolChoice,
    ToolDefinition as LlmToolDefinition,
};
use lattice_telemetry::{RequestContext, RequestGuard};
use lattice_tools::{execute_tool_calls, ApprovalPort, PendingToolCall, ToolContext, ToolPort, ToolStatus as DispatchStatus};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::conversation::{ConversationStore, RequestMetrics};
use crate::error::{RuntimeError, RuntimeResult};
use crate::metrics::MetricsBucket;

/// The conceptual states a `send` call moves through. Exposed on a
/// `tokio::sync::watch` channel so a caller can observe progress without
/// polling the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No `send` call is in flight.
    Idle,
    /// Waiting on (or consuming) an LLM completion.
    Thinking,
    /// Dispatching a batch of tool calls the model just requested.
    ToolRound,
    /// The turn finished normally.
    Done,
    /// The turn was cancelled before it finished.
    Cancelled,
    /// The turn ended in a fatal error.
    Error,
}

/// How a `send` call concluded.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The model produced a final reply with no further tool calls.
    Completed {
        /// Token usage accumulated across every round of this turn.
        usage: Usage,
    },
    /// The turn was cancelled via its [`CancellationToken`] before completing.
    Cancelled,
}

/// Everything one `send` call needs that outlives the call itself.
pub struct Orchestrator {
    session_id: SessionId,
    agent: AgentConfig,
    workspace_root: PathBuf,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolPort>,
    approval: Arc<dyn ApprovalPort>,
    conversations: Arc<ConversationStore>,
    metrics: Arc<MetricsBucket>,
    events: Arc<EventBus>,
    state_tx: watch::Sender<TurnState>,
}

/// Mirrors `lattice_core::env::DEFAULT_FOLDER_TREE_LIMIT`, which is not
/// re-exported (the prompt renderer is the sole caller of this default).
const FOLDER_TREE_LIMIT: usize = 200;

/// Render a system prompt with injected environment facts, the way a
/// dynamically-assembled prompt picks up workspace context: the agent's
/// configured prompt stays verbatim, with environment details appended as a
/// trailing section.
#[must_use]
pub fn render_system_prompt(agent: &AgentConfig, env: &RuntimeEnv) -> String {
    let tree = env.bounded_folder_tree(FOLDER_TREE_LIMIT);
    let mut rendered = agent.system_prompt.clone();
    rendered.push_str("\n\n## Environment\n");
    rendered.push_str(&format!("- Date: {}\n", env.now().to_rfc3339()));
    rendered.push_str(&format!("- Platform: {}\n", env.platform()));
    rendered.push_str(&format!("- Working directory: {}\n", env.cwd().display()));
    if !env.available_agents().is_empty() {
        rendered.push_str(&format!("- Available sub-agents: {}\n", env.available_agents().join(", ")));
    }
    if !tree.is_empty() {
        rendered.push_str("- Workspace files:\n");
        for entry in &tree {
            rendered.push_str(&format!("  - {entry}\n"));
        }
    }
    rendered
}

impl Orchestrator {
    /// Build an orchestrator for one session.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: SessionId,
        agent: AgentConfig,
        workspace_root: PathBuf,
        llm: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolPort>,
        approval: Arc<dyn ApprovalPort>,
        conversations: Arc<ConversationStore>,
        metrics: Arc<MetricsBucket>,
        events: Arc<EventBus>,
    ) -> Self {
        let (state_tx, _rx) = watch::channel(TurnState::Idle);
        Self { session_id, agent, workspace_root, llm, tools, approval, conversations, metrics, events, state_tx }
    }

    /// Observe this orchestrator's current [`TurnState`].
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<TurnState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: TurnState) {
        let _ = self.state_tx.send(state);
    }

    /// Drive one `send` call to completion: persist the user message, stream
    /// the model's reply, execute any tool calls it requests, and loop until
    /// it stops calling tools.
    pub async fn send(&self, conversation_id: &ConversationId, user_text: impl Into<String>, env: &RuntimeEnv, cancel: &CancellationToken) -> RuntimeResult<TurnOutcome> {
        let request_ctx = RequestContext::new(self.session_id.clone(), conversation_id.clone(), "orchestrator");
        let _guard = RequestGuard::new(request_ctx);

        let system_prompt = render_system_prompt(&self.agent, env);
        let mut history = self.conversations.get(conversation_id).await.unwrap_or_default();

        let user_message = Message::user(user_text.into());
        self.events.publish(Event::UserMessage { content: user_message.text(), metadata: serde_json::Value::Null });
        self.conversations.append(conversation_id, vec![user_message.clone()]).await;
        history.push(user_message);

        let tool_ctx = ToolContext::new(self.workspace_root.clone());
        let mut turn_usage = Usage::default();

        loop {
            if cancel.is_cancelled() {
                self.set_state(TurnState::Cancelled);
                return Ok(TurnOutcome::Cancelled);
            }

            self.set_state(TurnState::Thinking);
            let round = match self.run_thinking_round(&system_prompt, &history, cancel).await {
                Ok(Some(round)) => round,
                Ok(None) => {
                    self.set_state(TurnState::Cancelled);
                    return Ok(TurnOutcome::Cancelled);
                },
                Err(e) => {
                    self.set_state(TurnState::Error);
                    self.events.publish(Event::Error { message: e.to_string() });
                    return Err(e);
                },
            };

            turn_usage = turn_usage.merged_with(round.usage);
            self.metrics.record_llm_call(round.usage, 0.0);
            self.conversations
                .record_request_metrics(
                    conversation_id,
                    RequestMetrics { usage: round.usage, context_window_limit: None, response_time_ms: round.elapsed_ms, cost: 0.0 },
                )
                .await;

            let assistant_message = if round.tool_calls.is_empty() {
                Message::assistant(round.text.clone())
            } else {
                Message::assistant_with_tools(round.text.clone(), round.tool_calls.clone())
            };
            self.events.publish(Event::AssistantMessage {
                content: round.text.clone(),
                tool_calls: if round.tool_calls.is_empty() {
                    None
                } else {
                    Some(round.tool_calls.iter().map(|c| ToolCallSummary { id: c.id.clone(), name: c.name.clone(), arguments: c.arguments.clone() }).collect())
                },
                usage: Some(round.usage),
            });
            self.conversations.append(conversation_id, vec![assistant_message.clone()]).await;
            history.push(assistant_message);

            if round.tool_calls.is_empty() {
                self.set_state(TurnState::Done);
                self.events.publish(Event::Done { usage: Some(turn_usage) });
                return Ok(TurnOutcome::Completed { usage: turn_usage });
            }

            self.set_state(TurnState::ToolRound);
            if self.run_tool_round(conversation_id, &round.tool_calls, &tool_ctx, &mut history, cancel).await.is_none() {
                self.set_state(TurnState::Cancelled);
                return Ok(TurnOutcome::Cancelled);
            }
        }
    }

    async fn run_thinking_round(&self, system_prompt: &str, history: &[Message], cancel: &CancellationToken) -> RuntimeResult<Option<ThinkingRound>> {
        let started = Instant::now();
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend(history.iter().cloned());

        let tools = self.offered_tool_definitions().await;
        let params = CompletionParams {
            model: self.agent.model.clone(),
            messages,
            tools,
            tool_choice: ToolChoice::Auto,
            temperature: self.agent.temperature,
            top_p: self.agent.top_p,
            max_tokens: self.agent.max_tokens,
            reasoning_effort: self.agent.reasoning_effort.map(|e| format!("{e:?}").to_lowercase()),
            thinking_budget_tokens: self.agent.thinking_budget_tokens,
        };

        let mut stream = self.llm.stream_completion(params).await?;

        let mut text = String::new();
        let mut usage = Usage::default();
        let mut stop_reason = None;
        let mut open_calls: Vec<LlmToolCall> = Vec::new();

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(None),
                event = stream.next() => event,
            };
            let Some(event) = event else { break };

            match event {
                StreamEvent::TextDelta(delta) => {
                    text.push_str(&delta);
                    self.events.publish(Event::AssistantChunk { delta, usage: None });
                },
                StreamEvent::ToolCallStart { id, name } => {
                    open_calls.push(LlmToolCall::new(id, name));
                },
                StreamEvent::ToolCallDelta { id, args_delta } => {
                    if let Some(call) = open_calls.iter_mut().find(|c| c.id == id) {
                        call.arguments.push_str(&args_delta);
                    }
                },
                StreamEvent::ToolCallEnd { .. } => {},
                StreamEvent::ReasoningDelta(delta) => {
                    debug!(chars = delta.len(), "reasoning delta received");
                },
                StreamEvent::Usage(u) => usage = usage.merged_with(u),
                StreamEvent::Done { stop_reason: reason } => {
                    stop_reason = reason;
                    break;
                },
                StreamEvent::Error(message) => {
                    return Err(RuntimeError::InternalInvariant(format!("stream error: {message}")));
                },
            }
        }

        self.events.publish(Event::StreamFinish { finish_reason: stop_reason.map(|r| format!("{r:?}")), usage: Some(usage) });

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let tool_calls = if matches!(stop_reason, Some(StopReason::ToolCalls)) || !open_calls.is_empty() { open_calls } else { Vec::new() };

        Ok(Some(ThinkingRound { text, usage, tool_calls, elapsed_ms }))
    }

    async fn offered_tool_definitions(&self) -> Vec<LlmToolDefinition> {
        let all = self.tools.get_tool_definitions().await;
        all.into_iter()
            .filter(|d| self.agent.enabled_tools.is_empty() || self.agent.enabled_tools.contains(&d.name))
            .map(|d| LlmToolDefinition { name: d.name, description: d.description, parameters: d.parameters })
            .collect()
    }

    /// Execute one round of tool calls, appending their results to both the
    /// in-memory and persisted history. Returns `None` if cancelled mid-round.
    async fn run_tool_round(
        &self,
        conversation_id: &ConversationId,
        calls: &[LlmToolCall],
        tool_ctx: &ToolContext,
        history: &mut Vec<Message>,
        cancel: &CancellationToken,
    ) -> Option<()> {
        for call in calls {
            self.events.publish(Event::ToolCallStart { id: call.id.clone(), name: call.name.clone(), parameters: call.parsed_arguments() });
        }

        let pending: Vec<PendingToolCall> =
            calls.iter().map(|c| PendingToolCall { call_id: c.id.clone(), name: c.name.clone(), arguments: c.parsed_arguments() }).collect();

        let started = Instant::now();
        let results = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            results = execute_tool_calls(
                &*self.tools,
                &*self.approval,
                pending,
                tool_ctx,
                usize::try_from(self.agent.max_tool_concurrency).unwrap_or(1),
                self.agent.require_tool_approval,
            ) => results,
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut tool_messages = Vec::with_capacity(results.len());
        for (call, result) in calls.iter().zip(results.iter()) {
            self.metrics.record_tool_call();
            self.events.publish(Event::ToolCallResult {
                id: result.call_id.clone(),
                name: call.name.clone(),
                status: map_dispatch_status(result.status),
                result: serde_json::Value::String(result.output.clone()),
                duration_ms,
            });

            let is_error = result.status != DispatchStatus::Ok;
            let tool_result = lattice_llm::ToolCallResult { call_id: result.call_id.clone(), content: result.output.clone(), is_error };
            tool_messages.push(Message::tool_result(&tool_result, call.name.clone()));
        }

        self.conversations.append(conversation_id, tool_messages.clone()).await;
        history.extend(tool_messages);
        Some(())
    }
}

fn map_dispatch_status(status: DispatchStatus) -> EventToolStatus {
    match status {
        DispatchStatus::Ok => EventToolStatus::Success,
        DispatchStatus::Error => EventToolStatus::Error,
        DispatchStatus::Denied => EventToolStatus::Denied,
        DispatchStatus::Timeout => EventToolStatus::Timeout,
    }
}

struct ThinkingRound {
    text: String,
    usage: Usage,
    tool_calls: Vec<LlmToolCall>,
    elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn rendered_system_prompt_carries_platform_and_cwd() {
        let agent = AgentConfig { system_prompt: "You are helpful.".to_string(), ..AgentConfig::default() };
        let env = RuntimeEnv::pinned(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(), "linux", PathBuf::from("/tmp/project"), vec!["researcher".to_string()]);

        let rendered = render_system_prompt(&agent, &env);

        assert!(rendered.starts_with("You are helpful."));
        assert!(rendered.contains("linux"));
        assert!(rendered.contains("/tmp/project"));
        assert!(rendered.contains("researcher"));
    }
}
