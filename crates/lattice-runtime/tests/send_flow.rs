//! Black-box tests driving `Orchestrator::send` against a scripted LLM, the
//! way a real provider's streamed response would arrive.

use std::path::PathBuf;
use std::sync::Arc;

use lattice_core::{RuntimeEnv, SessionId, Usage};
use lattice_events::EventBus;
use lattice_runtime::{ConversationStore, MetricsBucket, Orchestrator, TurnOutcome};
use lattice_test::{fragmented_text_response, test_agent_config, test_conversation_id, tool_call_response, EventRecorder, ScriptedLlmProvider};
use lattice_tools::{AutoApprove, ToolRegistry};
use tokio_util::sync::CancellationToken;

fn env() -> RuntimeEnv {
    RuntimeEnv::current(PathBuf::from("."), vec![])
}

#[tokio::test]
async fn a_plain_text_reply_completes_without_any_tool_round() {
    let llm = ScriptedLlmProvider::new().with_stream_script(fragmented_text_response(&["Hel", "lo, ", "world!"], Usage::new(10, 5)));
    let events = Arc::new(EventBus::new());
    let mut recorder = EventRecorder::new(&events);

    let orchestrator = Orchestrator::new(
        SessionId::new(),
        test_agent_config("test-model"),
        PathBuf::from("."),
        Arc::new(llm),
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(AutoApprove),
        Arc::new(ConversationStore::new()),
        Arc::new(MetricsBucket::new()),
        events.clone(),
    );

    let conversation_id = test_conversation_id();
    let outcome = orchestrator.send(&conversation_id, "hi there", &env(), &CancellationToken::new()).await.unwrap();

    match outcome {
        TurnOutcome::Completed { usage } => assert_eq!(usage.total_tokens, 15),
        TurnOutcome::Cancelled => panic!("expected completion"),
    }

    let published = recorder.drain();
    assert!(published.iter().any(|e| matches!(e, lattice_events::Event::Done { .. })));
}

#[tokio::test]
async fn a_single_tool_round_feeds_the_result_back_and_then_completes() {
    let llm = ScriptedLlmProvider::new()
        .with_stream_script(tool_call_response("call-1", "glob", &[r#"{"pattern":"#, r#""*.rs"}"#], Usage::new(20, 10)))
        .with_stream_script(fragmented_text_response(&["done."], Usage::new(30, 5)));
    let events = Arc::new(EventBus::new());

    let orchestrator = Orchestrator::new(
        SessionId::new(),
        test_agent_config("test-model"),
        PathBuf::from("."),
        Arc::new(llm),
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(AutoApprove),
        Arc::new(ConversationStore::new()),
        Arc::new(MetricsBucket::new()),
        events,
    );

    let conversation_id = test_conversation_id();
    let outcome = orchestrator.send(&conversation_id, "list the files", &env(), &CancellationToken::new()).await.unwrap();

    match outcome {
        // `turn_usage` tracks the latest round's usage (merged_with takes the
        // newer nonzero value per field), not a running total across rounds.
        TurnOutcome::Completed { usage } => assert_eq!(usage.total_tokens, 35),
        TurnOutcome::Cancelled => panic!("expected completion"),
    }
}

#[tokio::test]
async fn cancelling_before_the_first_round_returns_cancelled_without_calling_the_llm() {
    let llm = ScriptedLlmProvider::new();
    let events = Arc::new(EventBus::new());
    let orchestrator = Orchestrator::new(
        SessionId::new(),
        test_agent_config("test-model"),
        PathBuf::from("."),
        Arc::new(llm),
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(AutoApprove),
        Arc::new(ConversationStore::new()),
        Arc::new(MetricsBucket::new()),
        events,
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = orchestrator.send(&test_conversation_id(), "hi", &env(), &cancel).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Cancelled));
}

#[tokio::test]
async fn a_mid_stream_error_bubbles_out_and_appends_no_assistant_message() {
    let llm = ScriptedLlmProvider::new().with_stream_script(lattice_test::error_response("upstream exploded"));
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
    let result = orchestrator.send(&conversation_id, "hi", &env(), &CancellationToken::new()).await;
    assert!(result.is_err());

    let view = conversations.get_conversation(&conversation_id).await;
    assert_eq!(view.messages.len(), 1, "only the user message should have been persisted");
}
