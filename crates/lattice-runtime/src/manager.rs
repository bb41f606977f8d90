//! The Orchestrator Manager (L7): wraps [`Orchestrator`] with hot-reload,
//! retry, the context-window watchdog, auto-summary, topic analysis, and
//! session lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lattice_config::AgentConfig;
use lattice_core::{ConversationId, RuntimeEnv, SessionId};
use lattice_events::{Event, EventBus};
use lattice_llm::{LlmProvider, Message, MessageRole};
use lattice_mcp::McpToolPort;
use lattice_tools::{ApprovalPort, AutoApprove, ToolPort, ToolRegistry};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::conversation::ConversationStore;
use crate::error::RuntimeResult;
use crate::metrics::MetricsBucket;
use crate::orchestrator::{Orchestrator, TurnOutcome};

/// Tunable policy for the manager's retry loop and context-window watchdog.
#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    /// Maximum `send` attempts (the first try plus retries) before a
    /// retryable error is allowed to bubble out.
    pub max_attempts: u32,
    /// Fixed delay between retry attempts.
    pub retry_delay: Duration,
    /// Prompt-token-to-context-window ratio that triggers a warning event.
    pub warn_usage_ratio: f64,
    /// Ratio that triggers auto-summary.
    pub auto_summary_ratio: f64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { max_attempts: 10, retry_delay: Duration::from_secs(10), warn_usage_ratio: 0.85, auto_summary_ratio: 0.95 }
    }
}

/// Runs one session's active orchestrator across its lifetime: hot-reloaded
/// config, retried sends, a context-window watchdog, and auto-maintained
/// conversation topics.
pub struct OrchestratorManager {
    session_id: SessionId,
    workspace_root: PathBuf,
    agent: RwLock<AgentConfig>,
    llm: RwLock<Arc<dyn LlmProvider>>,
    tools: Arc<dyn ToolPort>,
    approval: Arc<dyn ApprovalPort>,
    conversations: Arc<ConversationStore>,
    metrics: Arc<MetricsBucket>,
    events: Arc<EventBus>,
    mcp: Option<Arc<McpToolPort>>,
    active_conversation_id: RwLock<ConversationId>,
    config: ManagerConfig,
}

impl OrchestratorManager {
    /// Initialize a manager for a fresh or resumed session, marking it
    /// ready once constructed.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        session_id: SessionId,
        workspace_root: PathBuf,
        agent: AgentConfig,
        llm: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolPort>,
        approval: Arc<dyn ApprovalPort>,
        conversations: Arc<ConversationStore>,
        metrics: Arc<MetricsBucket>,
        events: Arc<EventBus>,
        mcp: Option<Arc<McpToolPort>>,
        active_conversation_id: ConversationId,
        config: ManagerConfig,
    ) -> Self {
        let manager = Self {
            session_id,
            workspace_root,
            agent: RwLock::new(agent),
            llm: RwLock::new(llm),
            tools,
            approval,
            conversations,
            metrics,
            events: events.clone(),
            mcp,
            active_conversation_id: RwLock::new(active_conversation_id),
            config,
        };
        events.publish(Event::System { content: "session initialized".to_string(), color: None });
        manager
    }

    /// Swap in a newly loaded agent config, taking effect on the next `send`.
    pub async fn update_agent(&self, agent: AgentConfig) {
        *self.agent.write().await = agent;
    }

    /// Swap in a newly constructed LLM adapter (e.g. after a provider or
    /// model change), taking effect on the next `send`.
    pub async fn update_llm(&self, llm: Arc<dyn LlmProvider>) {
        *self.llm.write().await = llm;
    }

    /// Send a user message on the active (or given) conversation, retrying
    /// retryable failures at a fixed interval before giving up.
    pub async fn send(&self, text: impl Into<String>, conversation_id: Option<ConversationId>, cancel: &CancellationToken) -> RuntimeResult<TurnOutcome> {
        let conversation_id = match conversation_id {
            Some(id) => id,
            None => self.active_conversation_id.read().await.clone(),
        };
        let text = text.into();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let agent = self.agent.read().await.clone();
            let llm = self.llm.read().await.clone();
            let orchestrator = Orchestrator::new(
                self.session_id.clone(),
                agent,
                self.workspace_root.clone(),
                llm,
                self.tools.clone(),
                self.approval.clone(),
                self.conversations.clone(),
                self.metrics.clone(),
                self.events.clone(),
            );
            let env = RuntimeEnv::current(self.workspace_root.clone(), vec![]);

            match orchestrator.send(&conversation_id, text.clone(), &env, cancel).await {
                Ok(outcome) => {
                    if matches!(outcome, TurnOutcome::Completed { .. }) {
                        self.run_context_window_watchdog(&conversation_id).await;
                    }
                    return Ok(outcome);
                },
                Err(e) if e.kind().is_retryable() && attempt < self.config.max_attempts => {
                    self.events.publish(Event::System {
                        content: format!("retrying after error (attempt {attempt}/{}): {e}", self.config.max_attempts),
                        color: Some("yellow".to_string()),
                    });
                    tokio::select! {
                        () = cancel.cancelled() => return Ok(TurnOutcome::Cancelled),
                        () = tokio::time::sleep(self.config.retry_delay) => {},
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_context_window_watchdog(&self, conversation_id: &ConversationId) {
        let agent = self.agent.read().await.clone();
        let llm = self.llm.read().await.clone();

        let limit = match llm.get_models().await {
            Ok(models) => models.iter().find(|m| m.id == agent.model).and_then(|m| m.context_window),
            Err(e) => {
                warn!(error = %e, "could not query model limits, falling back to static table");
                None
            },
        }
        .or_else(|| lattice_config::fallback_context_window(&agent.model).map(|l| l.context_window));

        let Some(limit) = limit else { return };
        self.metrics.set_context_window(Some(limit));

        let snapshot = self.metrics.get_snapshot();
        let Some(usage_ratio) = snapshot.context_window_usage else { return };

        if usage_ratio >= self.config.auto_summary_ratio {
            self.events.publish(Event::System { content: format!("context window at {:.0}% — summarizing", usage_ratio * 100.0), color: Some("yellow".to_string()) });
            self.run_auto_summary(conversation_id).await;
        } else if usage_ratio >= self.config.warn_usage_ratio {
            self.events.publish(Event::System { content: format!("context window at {:.0}%", usage_ratio * 100.0), color: Some("yellow".to_string()) });
        }
    }

    /// Build a transient, single-use orchestrator that shares this
    /// manager's LLM adapter but none of its conversation/event/metrics
    /// state, used for auto-summary and topic analysis.
    async fn transient_orchestrator(&self, system_prompt: impl Into<String>) -> (Orchestrator, Arc<ConversationStore>, ConversationId) {
        let model = self.agent.read().await.model.clone();
        let transient_agent = AgentConfig { id: "transient".to_string(), system_prompt: system_prompt.into(), model, ..AgentConfig::default() };
        let llm = self.llm.read().await.clone();
        let conversations = Arc::new(ConversationStore::new());
        let orchestrator = Orchestrator::new(
            SessionId::new(),
            transient_agent,
            self.workspace_root.clone(),
            llm,
            Arc::new(ToolRegistry::new()),
            Arc::new(AutoApprove),
            conversations.clone(),
            Arc::new(MetricsBucket::new()),
            Arc::new(EventBus::new()),
        );
        (orchestrator, conversations, ConversationId::new())
    }

    async fn run_auto_summary(&self, conversation_id: &ConversationId) {
        let view = self.conversations.get_conversation(conversation_id).await;
        let transcript = view.messages.iter().map(|m| format!("{:?}: {}", m.role, m.text())).collect::<Vec<_>>().join("\n");

        let (orchestrator, transient_conversations, transient_id) =
            self.transient_orchestrator("Summarize the conversation so far concisely, preserving key facts, decisions, and open threads.").await;

        let env = RuntimeEnv::current(self.workspace_root.clone(), vec![]);
        let cancel = CancellationToken::new();
        let Ok(TurnOutcome::Completed { .. }) = orchestrator.send(&transient_id, transcript, &env, &cancel).await else {
            warn!("auto-summary failed; leaving history untouched");
            return;
        };

        let Some(summary) = last_assistant_text(&transient_conversations, &transient_id).await else {
            return;
        };

        let summary_message = Message::user(format!("Previous conversation summary:\n\n{summary}"));
        self.conversations.set(conversation_id.clone(), vec![summary_message]).await;
        self.metrics.reset();
        self.events.publish(Event::LinesClear);
        self.events.publish(Event::HeaderRefresh);
    }

    /// Re-derive the conversation's topic from its user messages, storing a
    /// short trimmed result as metadata. Failures are swallowed: a missing
    /// topic never blocks the conversation.
    pub async fn analyze_topic(&self, conversation_id: &ConversationId, latest_user_message: &str) {
        let view = self.conversations.get_conversation(conversation_id).await;
        let prior_user_text = view.messages.iter().filter(|m| m.role == MessageRole::User).map(Message::text).collect::<Vec<_>>().join("\n");
        let prompt = format!("{prior_user_text}\n{latest_user_message}");

        let (orchestrator, transient_conversations, transient_id) =
            self.transient_orchestrator("Reply in 5 to 10 words describing the topic of this conversation. No leading/trailing punctuation.").await;

        let env = RuntimeEnv::current(self.workspace_root.clone(), vec![]);
        let cancel = CancellationToken::new();
        let Ok(TurnOutcome::Completed { .. }) = orchestrator.send(&transient_id, prompt, &env, &cancel).await else {
            return;
        };

        if let Some(topic) = last_assistant_text(&transient_conversations, &transient_id).await {
            let trimmed = topic.trim();
            if !trimmed.is_empty() {
                self.conversations.update_topic(conversation_id, trimmed.to_string()).await;
            }
        }
    }

    /// Make `conversation_id` the active conversation without touching MCP
    /// connections or the LLM adapter.
    pub async fn switch_to_session(&self, conversation_id: ConversationId) {
        *self.active_conversation_id.write().await = conversation_id;
    }

    /// Start a brand-new conversation, resetting session metrics, and make
    /// it active.
    pub async fn create_new_conversation(&self) -> ConversationId {
        let id = ConversationId::new();
        *self.active_conversation_id.write().await = id.clone();
        self.metrics.reset();
        id
    }

    /// The currently active conversation id.
    pub async fn active_conversation_id(&self) -> ConversationId {
        self.active_conversation_id.read().await.clone()
    }

    /// Disconnect MCP servers. File logs write synchronously through a
    /// rolling appender with no separate handle to flush or close.
    pub async fn cleanup(&self) {
        if let Some(mcp) = &self.mcp {
            mcp.disconnect_all().await;
        }
    }
}

async fn last_assistant_text(conversations: &ConversationStore, conversation_id: &ConversationId) -> Option<String> {
    let view = conversations.get_conversation(conversation_id).await;
    view.messages.iter().rev().find(|m| m.role == MessageRole::Assistant).map(Message::text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_the_documented_retry_and_watchdog_thresholds() {
        let config = ManagerConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(10));
        assert!((config.warn_usage_ratio - 0.85).abs() < f64::EPSILON);
        assert!((config.auto_summary_ratio - 0.95).abs() < f64::EPSILON);
    }
}
