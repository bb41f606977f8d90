//! Fixtures for common types, so tests don't repeat boilerplate construction.

use lattice_config::AgentConfig;
use lattice_core::{ConversationId, SessionId};
use lattice_llm::ModelInfo;

/// A minimal agent config with no tools enabled, suitable for orchestrator
/// tests that only care about the thinking round.
#[must_use]
pub fn test_agent_config(model: impl Into<String>) -> AgentConfig {
    AgentConfig { id: "test-agent".to_string(), system_prompt: "You are a test agent.".to_string(), model: model.into(), ..AgentConfig::default() }
}

/// A fresh random session id.
#[must_use]
pub fn test_session_id() -> SessionId {
    SessionId::new()
}

/// A fresh random conversation id.
#[must_use]
pub fn test_conversation_id() -> ConversationId {
    ConversationId::new()
}

/// A model descriptor with a known context window, for watchdog tests.
#[must_use]
pub fn test_model_info(id: impl Into<String>, context_window: u32) -> ModelInfo {
    ModelInfo { id: id.into(), display_name: None, context_window: Some(context_window) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_carries_the_requested_model() {
        let agent = test_agent_config("gpt-4o");
        assert_eq!(agent.model, "gpt-4o");
        assert!(agent.enabled_tools.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(test_session_id(), test_session_id());
        assert_ne!(test_conversation_id(), test_conversation_id());
    }
}
