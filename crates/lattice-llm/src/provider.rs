//! The provider-agnostic LLM contract.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use lattice_core::Usage;

use crate::error::LlmResult;
use crate::models::ModelInfo;
use crate::types::{Message, StopReason, StreamEvent, ToolDefinition};

/// How the model should choose whether/which tool to call.
#[derive(Debug, Clone, Default)]
pub enum ToolChoice {
    /// Let the model decide (default).
    #[default]
    Auto,
    /// Never call a tool.
    None,
    /// The model must call some tool.
    Required,
    /// The model must call this specific tool.
    Named(String),
}

/// Parameters for one completion request, independent of provider wire format.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Target model id.
    pub model: String,
    /// Conversation so far, in order.
    pub messages: Vec<Message>,
    /// Tools offered to the model, if any.
    pub tools: Vec<ToolDefinition>,
    /// Tool selection strategy.
    pub tool_choice: ToolChoice,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling parameter.
    pub top_p: f64,
    /// Hard cap on generated tokens, if any.
    pub max_tokens: Option<u32>,
    /// Opaque reasoning effort hint (OpenAI-style `o1`/`o3` models).
    pub reasoning_effort: Option<String>,
    /// Opaque extended-thinking token budget (Anthropic-style).
    pub thinking_budget_tokens: Option<u32>,
}

/// The full (non-streaming) result of a completion call.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    /// The assistant's reply message.
    pub message: Message,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// Token accounting for this call.
    pub usage: Usage,
}

/// A boxed stream of [`StreamEvent`]s.
pub type StreamBox = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Optional side-channel callbacks a caller can attach to a streaming call,
/// mirroring what [`StreamBox`] already carries but useful for callers that
/// want push notification without polling the stream.
#[derive(Default)]
pub struct StreamHandlers {
    /// Called for every text delta, in order.
    pub on_text: Option<Box<dyn Fn(&str) + Send + Sync>>,
    /// Called once generation finishes.
    pub on_done: Option<Box<dyn Fn(StopReason, &Usage) + Send + Sync>>,
}

impl std::fmt::Debug for StreamHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandlers")
            .field("on_text", &self.on_text.is_some())
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}

/// Implemented once per upstream wire format (OpenAI-compatible, Anthropic).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a completion to its end and return the full message.
    async fn generate_completion(&self, params: CompletionParams) -> LlmResult<CompletionResult>;

    /// Run a completion, yielding incremental events as they arrive.
    async fn stream_completion(&self, params: CompletionParams) -> LlmResult<StreamBox>;

    /// List models this provider currently supports, if discoverable.
    async fn get_models(&self) -> LlmResult<Vec<ModelInfo>>;
}
