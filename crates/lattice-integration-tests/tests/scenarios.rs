//! Black-box scenario tests driving the orchestrator and its manager end to
//! end against a scripted LLM. Scenarios covering a plain-text reply and a
//! clean single tool round live alongside `Orchestrator` in
//! `lattice-runtime/tests/send_flow.rs`; this crate covers the remaining
//! ones that need the full `OrchestratorManager` (retry, watchdog,
//! auto-summary) or exercise a tool-argument validation failure.

use std::path::PathBuf;
use std::sync::Arc;

use lattice_core::{RuntimeEnv, SessionId, Usage};
use lattice_events::EventBus;
use lattice_runtime::{ConversationStore, ManagerConfig, MetricsBucket, Orchestrator, OrchestratorManager, TurnOutcome};
use lattice_test::{fragmented_text_response, test_agent_config, test_conversation_id, test_model_info, tool_call_response, ScriptedLlmProvider};
use lattice_tools::{AutoApprove, ToolRegistry};
use tokio_util::sync::CancellationToken;

fn env() -> RuntimeEnv {
    RuntimeEnv::current(PathBuf::from("."), vec![])
}

/// A tool call whose arguments fail schema validation gets a `status=error`
/// result without ever dispatching, and the turn still completes with a
/// second LLM call for the final reply.
#[tokio::test]
async fn a_schema_invalid_tool_call_is_rejected_without_dispatch_and_the_turn_still_completes() {
    let llm = ScriptedLlmProvider::new()
        // `glob` requires `pattern`; this call omits it entirely.
        .with_stream_script(tool_call_response("call-1", "glob", &["{}"], Usage::new(20, 10)))
        .with_stream_script(fragmented_text_response(&["done."], Usage::new(30, 5)));
    let events = Arc::new(EventBus::new());
    let conversations = Arc::new(ConversationStore::new());

    let orchestrator = Orchestrator::new(
        SessionId::new(),
        test_agent_config("test-model"),
        PathBuf::from("."),
        Arc::new(llm),
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(AutoApprove),
        conversations.clone(),
        Arc::new(MetricsBucket::new()),
        events,
    );

    let conversation_id = test_conversation_id();
    let outcome = orchestrator.send(&conversation_id, "glob the crate", &env(), &CancellationToken::new()).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Completed { .. }));

    let view = conversations.get_conversation(&conversation_id).await;
    // user, assistant(tool call), tool(validation error), assistant(final).
    assert_eq!(view.messages.len(), 4, "a rejected tool call still appends a tool-result message and a final reply");
    assert!(
        view.messages[2].text().contains("Parameter validation failed"),
        "the rejected tool-result body names the validation failure"
    );
}

/// Once prompt usage crosses the manager's auto-summary threshold, the next
/// successful send triggers a summarizer turn, collapses history to one
/// synthesized message, and resets session metrics.
#[tokio::test]
async fn crossing_the_auto_summary_threshold_collapses_history_and_resets_metrics() {
    let llm = Arc::new(
        ScriptedLlmProvider::new()
            .with_models(vec![test_model_info("test-model", 1000)])
            // The real send: usage puts current_tokens at 960/1000 = 0.96.
            .with_stream_script(fragmented_text_response(&["working on it."], Usage::new(960, 0)))
            // The watchdog's transient summarizer turn.
            .with_stream_script(fragmented_text_response(&["previously discussed the project layout."], Usage::new(50, 10))),
    );
    let conversations = Arc::new(ConversationStore::new());
    let metrics = Arc::new(MetricsBucket::new());
    let events = Arc::new(EventBus::new());
    let conversation_id = test_conversation_id();

    let manager = OrchestratorManager::init(
        SessionId::new(),
        PathBuf::from("."),
        test_agent_config("test-model"),
        llm,
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(AutoApprove),
        conversations.clone(),
        metrics.clone(),
        events,
        None,
        conversation_id.clone(),
        ManagerConfig::default(),
    );

    let outcome = manager.send("how's the refactor going?", Some(conversation_id.clone()), &CancellationToken::new()).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Completed { .. }));

    let view = conversations.get_conversation(&conversation_id).await;
    assert_eq!(view.messages.len(), 1, "auto-summary replaces history with one synthesized message");
    assert!(view.messages[0].text().starts_with("Previous conversation summary:"));

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.total_tokens, 0, "auto-summary resets the session's metrics bucket");
}
