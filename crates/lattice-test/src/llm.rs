//! A scripted [`LlmProvider`] for driving orchestrator tests without a real
//! upstream call.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use lattice_core::Usage;
use lattice_llm::{
    CompletionParams, CompletionResult, LlmError, LlmProvider, LlmResult, Message, ModelInfo,
    StopReason, StreamBox, StreamEvent,
};

/// Replays pre-scripted stream/completion results, in call order, so a test
/// can assert on an orchestrator's behavior against a known LLM response
/// without a real upstream call.
#[derive(Default)]
pub struct ScriptedLlmProvider {
    stream_scripts: Mutex<Vec<Vec<StreamEvent>>>,
    completions: Mutex<Vec<LlmResult<CompletionResult>>>,
    models: Vec<ModelInfo>,
}

impl ScriptedLlmProvider {
    /// Build a provider with no scripted responses queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a streaming response, replayed on the next `stream_completion`
    /// call (FIFO across calls).
    #[must_use]
    pub fn with_stream_script(self, events: Vec<StreamEvent>) -> Self {
        self.stream_scripts.lock().expect("script queue poisoned").push(events);
        self
    }

    /// Queue a non-streaming response for the next `generate_completion` call.
    #[must_use]
    pub fn with_completion(self, result: LlmResult<CompletionResult>) -> Self {
        self.completions.lock().expect("completion queue poisoned").push(result);
        self
    }

    /// Set the models `get_models` reports.
    #[must_use]
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn generate_completion(&self, _params: CompletionParams) -> LlmResult<CompletionResult> {
        let mut queue = self.completions.lock().expect("completion queue poisoned");
        if queue.is_empty() {
            return Err(LlmError::StreamEndedUnexpectedly);
        }
        queue.remove(0)
    }

    async fn stream_completion(&self, _params: CompletionParams) -> LlmResult<StreamBox> {
        let mut queue = self.stream_scripts.lock().expect("script queue poisoned");
        if queue.is_empty() {
            return Err(LlmError::StreamEndedUnexpectedly);
        }
        let script = queue.remove(0);
        Ok(Box::pin(stream::iter(script)))
    }

    async fn get_models(&self) -> LlmResult<Vec<ModelInfo>> {
        Ok(self.models.clone())
    }
}

/// Build a scripted stream for a plain-text reply delivered in one chunk.
#[must_use]
pub fn text_response(text: impl Into<String>, usage: Usage) -> Vec<StreamEvent> {
    fragmented_text_response(&[&text.into()], usage)
}

/// Build a scripted stream for a plain-text reply delivered as the given
/// fragments, in order — useful for exercising SSE-style reassembly where a
/// provider splits one logical chunk across multiple deltas.
#[must_use]
pub fn fragmented_text_response(fragments: &[&str], usage: Usage) -> Vec<StreamEvent> {
    let mut events: Vec<StreamEvent> = fragments.iter().map(|f| StreamEvent::TextDelta((*f).to_string())).collect();
    events.push(StreamEvent::Usage(usage));
    events.push(StreamEvent::Done { stop_reason: Some(StopReason::Stop) });
    events
}

/// Build a scripted stream for a single tool call, with its arguments JSON
/// delivered as the given fragments.
#[must_use]
pub fn tool_call_response(id: impl Into<String>, name: impl Into<String>, argument_fragments: &[&str], usage: Usage) -> Vec<StreamEvent> {
    let id = id.into();
    let mut events = vec![StreamEvent::ToolCallStart { id: id.clone(), name: name.into() }];
    events.extend(argument_fragments.iter().map(|f| StreamEvent::ToolCallDelta { id: id.clone(), args_delta: (*f).to_string() }));
    events.push(StreamEvent::ToolCallEnd { id });
    events.push(StreamEvent::Usage(usage));
    events.push(StreamEvent::Done { stop_reason: Some(StopReason::ToolCalls) });
    events
}

/// Build a scripted stream that immediately errors mid-generation.
#[must_use]
pub fn error_response(message: impl Into<String>) -> Vec<StreamEvent> {
    vec![StreamEvent::Error(message.into())]
}

/// A non-streaming completion carrying plain assistant text and no tool calls.
#[must_use]
pub fn completion_result(text: impl Into<String>, usage: Usage) -> CompletionResult {
    CompletionResult { message: Message::assistant(text), stop_reason: StopReason::Stop, usage }
}
