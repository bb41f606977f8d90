//! Backs the `assign_task` tool by running a child [`Orchestrator`] turn.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lattice_config::AgentConfig;
use lattice_core::{ConversationId, RuntimeEnv, SessionId};
use lattice_events::EventBus;
use lattice_llm::{LlmProvider, MessageRole};
use lattice_tools::{
    ApprovalPort, AssignTaskTool, BuiltinTool, CompositeToolPort, DelegationBackend, DelegationOutcome, ToolContext, ToolDefinitionExport, ToolError, ToolPort,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::conversation::ConversationStore;
use crate::metrics::MetricsBucket;
use crate::orchestrator::{Orchestrator, TurnOutcome};

/// How many delegation hops are allowed below the top-level `send` call,
/// matching `assign_task`'s conservative default.
pub const DEFAULT_MAX_DELEGATION_DEPTH: u32 = 1;

/// Named agent configurations `assign_task` may delegate to.
#[derive(Debug, Clone, Default)]
pub struct AgentRoster(HashMap<String, AgentConfig>);

impl AgentRoster {
    /// Build a roster keyed by each agent's own id.
    #[must_use]
    pub fn new(agents: impl IntoIterator<Item = AgentConfig>) -> Self {
        Self(agents.into_iter().map(|a| (a.id.clone(), a)).collect())
    }

    /// Look up an agent by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AgentConfig> {
        self.0.get(id)
    }

    /// Every known agent id, sorted for deterministic error messages.
    #[must_use]
    pub fn known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.0.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Exposes exactly one [`BuiltinTool`] as a [`ToolPort`], so `assign_task`
/// can be composed alongside the base tool set without the two knowing
/// about each other.
struct SingleToolPort {
    tool: Box<dyn BuiltinTool>,
}

#[async_trait]
impl ToolPort for SingleToolPort {
    async fn get_tool_definitions(&self) -> Vec<ToolDefinitionExport> {
        vec![ToolDefinitionExport { name: self.tool.name().to_string(), description: self.tool.description().to_string(), parameters: self.tool.input_schema() }]
    }

    async fn has_tool(&self, name: &str) -> bool {
        name == self.tool.name()
    }

    async fn call(&self, name: &str, arguments: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        if name != self.tool.name() {
            return Err(ToolError::Other(format!("unknown tool: {name}")));
        }
        self.tool.execute(arguments, ctx).await
    }
}

/// Runs `assign_task` calls by constructing and running a child
/// [`Orchestrator`] turn, recursively offering `assign_task` again up to
/// `max_depth` hops below the call that first delegated.
#[derive(Clone)]
pub struct OrchestratorDelegationBackend {
    roster: Arc<AgentRoster>,
    llm: Arc<dyn LlmProvider>,
    base_tools: Arc<dyn ToolPort>,
    approval: Arc<dyn ApprovalPort>,
    conversations: Arc<ConversationStore>,
    events: Arc<EventBus>,
    workspace_root: PathBuf,
    depth: u32,
    max_depth: u32,
}

impl OrchestratorDelegationBackend {
    /// Build a top-level (depth 0) delegation backend.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        roster: Arc<AgentRoster>,
        llm: Arc<dyn LlmProvider>,
        base_tools: Arc<dyn ToolPort>,
        approval: Arc<dyn ApprovalPort>,
        conversations: Arc<ConversationStore>,
        events: Arc<EventBus>,
        workspace_root: PathBuf,
        max_depth: u32,
    ) -> Self {
        Self { roster, llm, base_tools, approval, conversations, events, workspace_root, depth: 0, max_depth }
    }

    fn deeper(&self) -> Self {
        Self { depth: self.depth + 1, ..self.clone() }
    }
}

#[async_trait]
impl DelegationBackend for OrchestratorDelegationBackend {
    async fn assign_task(&self, agent: &str, task: &str, resume: Option<String>) -> Result<DelegationOutcome, ToolError> {
        if self.depth >= self.max_depth {
            return Err(ToolError::Delegation(format!("delegation depth limit ({}) reached", self.max_depth)));
        }

        let config = self
            .roster
            .get(agent)
            .ok_or_else(|| ToolError::Delegation(format!("unknown agent: {agent} (known: {})", self.roster.known_ids().join(", "))))?
            .clone();

        let conversation_id = resume.map(ConversationId::from_string).unwrap_or_else(ConversationId::new);
        let session_id = SessionId::new();

        let child_assign_task = AssignTaskTool::new(self.deeper());
        let tools: Arc<dyn ToolPort> =
            Arc::new(CompositeToolPort::new(vec![self.base_tools.clone(), Arc::new(SingleToolPort { tool: Box::new(child_assign_task) })]));

        let metrics = Arc::new(MetricsBucket::new());
        let orchestrator = Orchestrator::new(
            session_id.clone(),
            config,
            self.workspace_root.clone(),
            self.llm.clone(),
            tools,
            self.approval.clone(),
            self.conversations.clone(),
            metrics,
            self.events.clone(),
        );

        let env = RuntimeEnv::current(self.workspace_root.clone(), self.roster.known_ids());
        let cancel = CancellationToken::new();
        let outcome = orchestrator.send(&conversation_id, task.to_string(), &env, &cancel).await.map_err(|e| ToolError::Delegation(e.to_string()))?;

        let summary = match outcome {
            TurnOutcome::Completed { .. } => {
                let view = self.conversations.get_conversation(&conversation_id).await;
                view.messages.iter().rev().find(|m| m.role == MessageRole::Assistant).map(lattice_llm::Message::text).unwrap_or_default()
            },
            TurnOutcome::Cancelled => "delegation was cancelled before it completed".to_string(),
        };

        Ok(DelegationOutcome { session_id: session_id.to_string(), summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_llm::{CompletionParams, CompletionResult, LlmResult, StreamBox};
    use lattice_tools::{AutoApprove, ToolRegistry};

    struct UnusedProvider;

    #[async_trait]
    impl LlmProvider for UnusedProvider {
        async fn generate_completion(&self, _params: CompletionParams) -> LlmResult<CompletionResult> {
            unreachable!("depth-limited tests never reach the LLM")
        }

        async fn stream_completion(&self, _params: CompletionParams) -> LlmResult<StreamBox> {
            unreachable!("depth-limited tests never reach the LLM")
        }

        async fn get_models(&self) -> LlmResult<Vec<lattice_llm::ModelInfo>> {
            unreachable!("depth-limited tests never reach the LLM")
        }
    }

    fn backend_at(depth: u32, max_depth: u32) -> OrchestratorDelegationBackend {
        let roster = Arc::new(AgentRoster::new(vec![AgentConfig { id: "reviewer".to_string(), ..AgentConfig::default() }]));
        let mut backend = OrchestratorDelegationBackend::new(
            roster,
            Arc::new(UnusedProvider),
            Arc::new(ToolRegistry::with_defaults()),
            Arc::new(AutoApprove),
            Arc::new(ConversationStore::new()),
            Arc::new(EventBus::new()),
            std::env::temp_dir(),
            max_depth,
        );
        backend.depth = depth;
        backend
    }

    #[tokio::test]
    async fn depth_at_or_past_the_limit_is_rejected_before_any_llm_call() {
        let backend = backend_at(1, 1);
        let err = backend.assign_task("reviewer", "look at this", None).await.unwrap_err();
        assert!(err.to_string().contains("depth limit"));
    }

    #[tokio::test]
    async fn unknown_agent_lists_known_ids() {
        let backend = backend_at(0, 1);
        let err = backend.assign_task("ghost", "do a thing", None).await.unwrap_err();
        assert!(err.to_string().contains("reviewer"));
    }
}
