//! Lattice LLM — the provider-agnostic LLM Adapter.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod anthropic;
mod error;
mod models;
mod openai_compat;
mod provider;
mod types;

pub use anthropic::AnthropicProvider;
pub use error::{LlmError, LlmResult};
pub use models::{ModelInfo, dedup_models_by_id};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{
    CompletionParams, CompletionResult, LlmProvider, StreamBox, StreamHandlers, ToolChoice,
};
pub use types::{
    ContentPart, Message, MessageContent, MessageRole, StopReason, StreamEvent, ToolCall,
    ToolCallResult, ToolDefinition,
};
