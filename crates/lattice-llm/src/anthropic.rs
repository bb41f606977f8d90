//! Anthropic messages API provider: prompt-caching hints, tool-result content
//! blocks, and the beta headers Claude Code OAuth credentials require.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use lattice_core::Usage;
use lattice_transport::AuthTransport;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};
use crate::models::ModelInfo;
use crate::provider::{CompletionParams, CompletionResult, LlmProvider, StreamBox, ToolChoice};
use crate::types::{Message, MessageContent, MessageRole, StopReason, StreamEvent, ToolCall};

const OAUTH_BETA_HEADERS: &str =
    "oauth-2025-04-20,claude-code-20250219,interleaved-thinking-2025-05-14,fine-grained-tool-streaming-2025-05-14";

/// Whether the current credentials are Claude Code OAuth (as opposed to a
/// plain API key), which gates whether the beta header string is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicAuthKind {
    /// `x-api-key` credentials.
    ApiKey,
    /// OAuth access-token credentials.
    OAuth,
}

/// Talks to `POST /v1/messages`.
pub struct AnthropicProvider {
    transport: Arc<AuthTransport>,
    endpoint: String,
    auth_kind: AnthropicAuthKind,
}

impl AnthropicProvider {
    /// Build a provider posting messages to `endpoint` through `transport`.
    #[must_use]
    pub fn new(transport: Arc<AuthTransport>, endpoint: impl Into<String>, auth_kind: AnthropicAuthKind) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            auth_kind,
        }
    }

    fn extra_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if self.auth_kind == AnthropicAuthKind::OAuth {
            headers.insert("anthropic-beta".to_string(), OAUTH_BETA_HEADERS.to_string());
        }
        headers
    }

    fn build_request(&self, params: &CompletionParams, stream: bool) -> Value {
        let (system, messages) = split_system_and_convert(&params.messages);

        let mut request = serde_json::json!({
            "model": params.model,
            "messages": messages,
            "max_tokens": params.max_tokens.unwrap_or(4096),
            "temperature": params.temperature,
            "top_p": params.top_p,
            "stream": stream,
        });

        if !system.is_empty() {
            request["system"] = Value::Array(system);
        }

        if let Some(budget) = params.thinking_budget_tokens {
            request["thinking"] = serde_json::json!({"type": "enabled", "budget_tokens": budget});
        }

        if !params.tools.is_empty() {
            let tools: Vec<Value> = params
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            request["tools"] = Value::Array(tools);

            match &params.tool_choice {
                ToolChoice::Auto => {},
                ToolChoice::None => request["tool_choice"] = serde_json::json!({"type": "none"}),
                ToolChoice::Required => request["tool_choice"] = serde_json::json!({"type": "any"}),
                ToolChoice::Named(name) => {
                    request["tool_choice"] = serde_json::json!({"type": "tool", "name": name});
                },
            }
        }

        request
    }
}

/// Split out system messages (rendered as the Anthropic `system` array with
/// cache-control hints) and convert the remainder, applying the message
/// filtering and caching rules.
fn split_system_and_convert(messages: &[Message]) -> (Vec<Value>, Vec<Value>) {
    let system_msgs: Vec<&Message> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .collect();
    let non_system: Vec<&Message> = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .collect();

    let system_count = system_msgs.len();
    let system: Vec<Value> = system_msgs
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let mut block = serde_json::json!({"type": "text", "text": m.text()});
            if cache_hint_applies_to_first(i, system_count) {
                block["cache_control"] = serde_json::json!({"type": "ephemeral"});
            }
            block
        })
        .collect();

    // Filter messages with empty content, except the final message when it
    // is an assistant message (e.g. an assistant turn ending mid-tool-call).
    let last_index = non_system.len().saturating_sub(1);
    let filtered: Vec<(usize, &Message)> = non_system
        .into_iter()
        .enumerate()
        .filter(|(i, m)| {
            !m.content.is_empty() || (*i == last_index && m.role == MessageRole::Assistant)
        })
        .collect();

    let total = filtered.len();
    let messages: Vec<Value> = filtered
        .into_iter()
        .map(|(i, m)| {
            let mut value = convert_message(m);
            if cache_hint_applies_to_last_two(i, total) {
                apply_cache_control(&mut value);
            }
            value
        })
        .collect();

    (system, messages)
}

fn cache_hint_applies_to_first(index: usize, total: usize) -> bool {
    index < 2.min(total)
}

fn cache_hint_applies_to_last_two(index: usize, total: usize) -> bool {
    total > 0 && index + 2 >= total
}

fn apply_cache_control(value: &mut Value) {
    if let Some(content) = value.get_mut("content") {
        if let Some(arr) = content.as_array_mut() {
            if let Some(last) = arr.last_mut() {
                last["cache_control"] = serde_json::json!({"type": "ephemeral"});
            }
        }
    }
}

fn convert_message(msg: &Message) -> Value {
    let role = match msg.role {
        MessageRole::User | MessageRole::Tool => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => unreachable!("system messages are split out before conversion"),
    };

    if msg.role == MessageRole::Tool {
        return serde_json::json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": msg.tool_call_id,
                "content": msg.text(),
            }],
        });
    }

    if let Some(tool_calls) = &msg.tool_calls {
        let mut content = Vec::new();
        if !msg.text().is_empty() {
            content.push(serde_json::json!({"type": "text", "text": msg.text()}));
        }
        for tc in tool_calls {
            content.push(serde_json::json!({
                "type": "tool_use",
                "id": tc.id,
                "name": tc.name,
                "input": tc.parsed_arguments(),
            }));
        }
        return serde_json::json!({"role": "assistant", "content": content});
    }

    match &msg.content {
        MessageContent::Text(text) => serde_json::json!({
            "role": role,
            "content": [{"type": "text", "text": text}],
        }),
        MessageContent::Parts(_) => serde_json::json!({
            "role": role,
            "content": [{"type": "text", "text": msg.text()}],
        }),
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate_completion(&self, params: CompletionParams) -> LlmResult<CompletionResult> {
        let body = self.build_request(&params, false);
        debug!(model = %params.model, "anthropic completion request");

        let response = self
            .transport
            .post(&self.endpoint, &body, &self.extra_headers(), None)
            .await?;

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|_| LlmError::MalformedResponse("invalid anthropic response body".to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                AnthropicContentBlock::Text { text: t } => text.push_str(&t),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall {
                        id,
                        name,
                        arguments: input.to_string(),
                    });
                },
            }
        }

        let stop_reason = map_stop_reason(parsed.stop_reason.as_deref());
        let message = if tool_calls.is_empty() {
            Message::assistant(text)
        } else {
            Message::assistant_with_tools(text, tool_calls)
        };

        let usage = Usage {
            prompt_tokens: u64::from(parsed.usage.input_tokens),
            completion_tokens: u64::from(parsed.usage.output_tokens),
            total_tokens: u64::from(parsed.usage.input_tokens) + u64::from(parsed.usage.output_tokens),
            cached_tokens: None,
            cache_creation_input_tokens: parsed.usage.cache_creation_input_tokens.map(u64::from),
            cache_read_input_tokens: parsed.usage.cache_read_input_tokens.map(u64::from),
        };

        Ok(CompletionResult {
            message,
            stop_reason,
            usage,
        })
    }

    async fn stream_completion(&self, params: CompletionParams) -> LlmResult<StreamBox> {
        let body = self.build_request(&params, true);
        debug!(model = %params.model, "anthropic stream request");

        let response = self
            .transport
            .post(&self.endpoint, &body, &self.extra_headers(), None)
            .await?;

        let stream = try_stream! {
            let mut bytes = response.byte_stream();
            let mut buffer = String::new();
            let mut current_tool: Option<String> = None;

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(LlmError::from)?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(event_end) = buffer.find("\n\n") {
                    let event_data = buffer[..event_end].to_string();
                    buffer = buffer[event_end + 2..].to_string();

                    let mut data_line = None;
                    for line in event_data.lines() {
                        if let Some(data) = line.strip_prefix("data: ") {
                            data_line = Some(data);
                        }
                    }
                    let Some(data) = data_line else { continue };

                    let Ok(event) = serde_json::from_str::<AnthropicStreamEvent>(data) else {
                        warn!(frame = %data, "skipping unparseable anthropic SSE frame");
                        continue;
                    };

                    match event {
                        AnthropicStreamEvent::ContentBlockStart { content_block, .. } => {
                            if let AnthropicContentBlock::ToolUse { id, name, .. } = content_block {
                                current_tool = Some(id.clone());
                                yield StreamEvent::ToolCallStart { id, name };
                            }
                        },
                        AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                            AnthropicDelta::TextDelta { text } => yield StreamEvent::TextDelta(text),
                            AnthropicDelta::InputJsonDelta { partial_json } => {
                                if let Some(id) = &current_tool {
                                    yield StreamEvent::ToolCallDelta {
                                        id: id.clone(),
                                        args_delta: partial_json,
                                    };
                                }
                            },
                            AnthropicDelta::ThinkingDelta { thinking } => {
                                yield StreamEvent::ReasoningDelta(thinking);
                            },
                        },
                        AnthropicStreamEvent::ContentBlockStop { .. } => {
                            if let Some(id) = current_tool.take() {
                                yield StreamEvent::ToolCallEnd { id };
                            }
                        },
                        AnthropicStreamEvent::MessageDelta { usage, delta } => {
                            if let Some(usage) = usage {
                                yield StreamEvent::Usage(Usage {
                                    prompt_tokens: 0,
                                    completion_tokens: u64::from(usage.output_tokens),
                                    total_tokens: u64::from(usage.output_tokens),
                                    cached_tokens: None,
                                    cache_creation_input_tokens: None,
                                    cache_read_input_tokens: None,
                                });
                            }
                            let stop_reason = delta.stop_reason.as_deref().map(map_stop_reason);
                            if let Some(stop_reason) = stop_reason {
                                yield StreamEvent::Done { stop_reason: Some(stop_reason) };
                            }
                        },
                        AnthropicStreamEvent::MessageStop => {
                            yield StreamEvent::Done { stop_reason: None };
                            return;
                        },
                        AnthropicStreamEvent::Other => {},
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn get_models(&self) -> LlmResult<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => StopReason::Stop,
        Some("tool_use") => StopReason::ToolCalls,
        Some("max_tokens") => StopReason::Length,
        _ => StopReason::Other,
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    cache_creation_input_tokens: Option<u32>,
    #[serde(default)]
    cache_read_input_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    ContentBlockStart {
        #[serde(default)]
        index: u32,
        content_block: AnthropicContentBlock,
    },
    ContentBlockDelta {
        #[serde(default)]
        index: u32,
        delta: AnthropicDelta,
    },
    ContentBlockStop {
        #[serde(default)]
        index: u32,
    },
    MessageDelta {
        delta: AnthropicMessageDelta,
        #[serde(default)]
        usage: Option<AnthropicDeltaUsage>,
    },
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicDeltaUsage {
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn cache_hint_applies_to_first_two_only() {
        assert!(cache_hint_applies_to_first(0, 3));
        assert!(cache_hint_applies_to_first(1, 3));
        assert!(!cache_hint_applies_to_first(2, 3));
    }

    #[test]
    fn cache_hint_applies_to_last_two_only() {
        assert!(!cache_hint_applies_to_last_two(0, 4));
        assert!(cache_hint_applies_to_last_two(2, 4));
        assert!(cache_hint_applies_to_last_two(3, 4));
    }

    #[test]
    fn empty_message_dropped_unless_final_assistant() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant(""),
            Message::user("ho"),
        ];
        let (_, converted) = split_system_and_convert(&messages);
        // The empty assistant message in the middle is dropped; 2 remain.
        assert_eq!(converted.len(), 2);
    }

    #[test]
    fn empty_final_assistant_message_kept() {
        let messages = vec![Message::user("hi"), Message::assistant("")];
        let (_, converted) = split_system_and_convert(&messages);
        assert_eq!(converted.len(), 2);
    }

    #[test]
    fn oauth_kind_sends_beta_header_api_key_kind_does_not() {
        let transport = Arc::new(AuthTransport::new(
            lattice_transport::HttpTransport::new(reqwest::Client::new()),
            lattice_config::ProviderType::Anthropic,
            lattice_config::AuthMethod::ApiKey {
                value: "sk-ant-1".to_string(),
            },
        ));
        let oauth = AnthropicProvider::new(
            Arc::clone(&transport),
            "https://api.anthropic.com/v1/messages",
            AnthropicAuthKind::OAuth,
        );
        assert!(oauth.extra_headers().contains_key("anthropic-beta"));

        let api_key = AnthropicProvider::new(
            transport,
            "https://api.anthropic.com/v1/messages",
            AnthropicAuthKind::ApiKey,
        );
        assert!(!api_key.extra_headers().contains_key("anthropic-beta"));
    }
}
