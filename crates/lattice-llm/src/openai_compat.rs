//! OpenAI-compatible chat-completions provider: request construction and
//! SSE stream reassembly.

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

/// Talks to any `/chat/completions`-shaped endpoint (OpenAI, Azure OpenAI,
/// local inference servers that mimic the OpenAI wire format).
pub struct OpenAiCompatProvider {
    transport: Arc<AuthTransport>,
    endpoint: String,
}

impl OpenAiCompatProvider {
    /// Build a provider posting completions to `endpoint` through `transport`.
    #[must_use]
    pub fn new(transport: Arc<AuthTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    fn build_request(&self, params: &CompletionParams, stream: bool) -> Value {
        let messages: Vec<Value> = params.messages.iter().map(convert_message).collect();

        let mut request = serde_json::json!({
            "model": params.model,
            "messages": messages,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "stream": stream,
        });

        if let Some(max_tokens) = params.max_tokens {
            request["max_tokens"] = Value::from(max_tokens);
        }
        if let Some(effort) = &params.reasoning_effort {
            request["reasoning_effort"] = Value::from(effort.clone());
        }

        if !params.tools.is_empty() {
            let tools: Vec<Value> = params
                .tools
                .iter()
                .map(|t| {
                    let mut parameters = t.parameters.clone();
                    if let Some(obj) = parameters.as_object_mut() {
                        obj.entry("properties")
                            .or_insert_with(|| serde_json::json!({}));
                    }
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": parameters,
                        }
                    })
                })
                .collect();
            request["tools"] = Value::Array(tools);

            match &params.tool_choice {
                ToolChoice::Auto => {},
                ToolChoice::None => request["tool_choice"] = Value::from("none"),
                ToolChoice::Required => request["tool_choice"] = Value::from("required"),
                ToolChoice::Named(name) => {
                    request["tool_choice"] = serde_json::json!({
                        "type": "function",
                        "function": {"name": name},
                    });
                },
            }
        }

        request
    }
}

fn convert_message(msg: &Message) -> Value {
    let role = match msg.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
        MessageRole::Tool => "tool",
    };

    if let Some(tool_calls) = &msg.tool_calls {
        let converted: Vec<Value> = tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {"name": tc.name, "arguments": tc.arguments},
                })
            })
            .collect();
        return serde_json::json!({
            "role": "assistant",
            "content": if msg.text().is_empty() { Value::Null } else { Value::from(msg.text()) },
            "tool_calls": converted,
        });
    }

    if msg.role == MessageRole::Tool {
        return serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.text(),
        });
    }

    match &msg.content {
        MessageContent::Text(text) => serde_json::json!({"role": role, "content": text}),
        MessageContent::Parts(_) => serde_json::json!({"role": role, "content": msg.text()}),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn generate_completion(&self, params: CompletionParams) -> LlmResult<CompletionResult> {
        let body = self.build_request(&params, false);
        debug!(model = %params.model, "openai-compat completion request");

        let response = self
            .transport
            .post(&self.endpoint, &body, &HashMap::new(), None)
            .await?;

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|_| LlmError::MalformedResponse("invalid completion response body".to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?;

        let (message, stop_reason) = completion_to_message(choice);
        let usage = Usage::new(
            u64::from(parsed.usage.prompt_tokens),
            u64::from(parsed.usage.completion_tokens),
        );

        Ok(CompletionResult {
            message,
            stop_reason,
            usage,
        })
    }

    async fn stream_completion(&self, params: CompletionParams) -> LlmResult<StreamBox> {
        let body = self.build_request(&params, true);
        debug!(model = %params.model, "openai-compat stream request");

        let response = self
            .transport
            .post(&self.endpoint, &body, &HashMap::new(), None)
            .await?;

        let stream = try_stream! {
            let mut bytes = response.byte_stream();
            let mut aggregator = SseAggregator::default();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(LlmError::from)?;
                let (events, done) = aggregator.push(&String::from_utf8_lossy(&chunk));
                for event in events {
                    yield event;
                }
                if done {
                    return;
                }
            }

            for event in aggregator.finish() {
                yield event;
            }
        };

        Ok(Box::pin(stream))
    }

    async fn get_models(&self) -> LlmResult<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

/// Reassembles raw SSE byte chunks into `StreamEvent`s.
///
/// Pulled out of the `try_stream!` body so it can be driven over plain
/// `&str` chunks in tests, independent of a live `reqwest` byte stream.
#[derive(Default)]
struct SseAggregator {
    buffer: String,
    tool_calls: Vec<PartialToolCall>,
    seen_content: bool,
}

#[derive(Default)]
struct PartialToolCall {
    index: usize,
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    start_emitted: bool,
}

impl SseAggregator {
    /// Buffers `chunk`, emits any complete frames as `StreamEvent`s, and
    /// reports whether a `[DONE]` marker ended the stream.
    fn push(&mut self, chunk: &str) -> (Vec<StreamEvent>, bool) {
        let mut events = Vec::new();
        self.buffer.push_str(chunk);

        while let Some(event_end) = self.buffer.find("\n\n") {
            let event_data = self.buffer[..event_end].to_string();
            self.buffer = self.buffer[event_end + 2..].to_string();

            if self.process_frame(&event_data, &mut events) {
                return (events, true);
            }
        }

        (events, false)
    }

    /// Handles one `\n\n`-delimited frame. Returns `true` if it carried the
    /// `[DONE]` marker, meaning the caller should stop feeding more chunks.
    fn process_frame(&mut self, event_data: &str, events: &mut Vec<StreamEvent>) -> bool {
        for line in event_data.lines() {
            // Some servers prefix the very first frame with a stray blank
            // line; `data:` is still the marker to look for once a leading
            // newline is stripped from the line.
            let line = line.strip_prefix('\n').unwrap_or(line);
            let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                self.drain_tool_calls(events);
                events.push(StreamEvent::Done { stop_reason: None });
                return true;
            }

            let Ok(event) = serde_json::from_str::<OpenAiStreamEvent>(data) else {
                warn!(frame = %data, "skipping unparseable SSE frame");
                continue;
            };

            let Some(choice) = event.choices.into_iter().next() else {
                continue;
            };

            if let Some(content) = choice.delta.content {
                self.push_content(content, events);
            }

            if let Some(deltas) = choice.delta.tool_calls {
                for delta in deltas {
                    self.push_tool_call_delta(delta, events);
                }
            }

            if let Some(usage) = event.usage {
                events.push(StreamEvent::Usage(Usage::new(
                    u64::from(usage.prompt_tokens),
                    u64::from(usage.completion_tokens),
                )));
            }

            if let Some(reason) = choice.finish_reason {
                self.drain_tool_calls(events);
                events.push(StreamEvent::Done { stop_reason: Some(map_finish_reason(&reason)) });
            }
        }

        false
    }

    /// Drops consecutive newline-only fragments at the start of the content
    /// stream; once any non-newline content has appeared, all fragments
    /// (including pure newlines) pass through.
    fn push_content(&mut self, content: String, events: &mut Vec<StreamEvent>) {
        if content.is_empty() {
            return;
        }
        let is_newline_only = content.chars().all(|c| c == '\n');
        if is_newline_only && !self.seen_content {
            return;
        }
        if !is_newline_only {
            self.seen_content = true;
        }
        events.push(StreamEvent::TextDelta(content));
    }

    /// Groups fragments by `id` when present; an id-less continuation
    /// delta routes to the most recently opened call at that `index`. A
    /// new `id` arriving at an already-open `index` starts a new call
    /// instead of overwriting the existing one.
    fn push_tool_call_delta(&mut self, delta: OpenAiStreamToolCall, events: &mut Vec<StreamEvent>) {
        let slot = match &delta.id {
            Some(id) => match self.tool_calls.iter().position(|tc| tc.id.as_deref() == Some(id.as_str())) {
                Some(pos) => pos,
                None => {
                    self.tool_calls.push(PartialToolCall {
                        index: delta.index,
                        id: Some(id.clone()),
                        ..PartialToolCall::default()
                    });
                    self.tool_calls.len() - 1
                },
            },
            None => match self.tool_calls.iter().rposition(|tc| tc.index == delta.index) {
                Some(pos) => pos,
                None => {
                    self.tool_calls.push(PartialToolCall {
                        index: delta.index,
                        ..PartialToolCall::default()
                    });
                    self.tool_calls.len() - 1
                },
            },
        };

        if let Some(function) = delta.function {
            if let Some(name) = function.name {
                self.tool_calls[slot].name = Some(name);
            }
            if !self.tool_calls[slot].start_emitted {
                if let (Some(id), Some(name)) = (self.tool_calls[slot].id.clone(), self.tool_calls[slot].name.clone()) {
                    self.tool_calls[slot].start_emitted = true;
                    events.push(StreamEvent::ToolCallStart { id, name });
                }
            }
            if let Some(args) = function.arguments {
                self.tool_calls[slot].arguments.push_str(&args);
                if let Some(id) = self.tool_calls[slot].id.clone() {
                    events.push(StreamEvent::ToolCallDelta { id, args_delta: args });
                }
            }
        }
    }

    fn drain_tool_calls(&mut self, events: &mut Vec<StreamEvent>) {
        for tc in self.tool_calls.drain(..) {
            if let Some(id) = tc.id {
                events.push(StreamEvent::ToolCallEnd { id });
            }
        }
    }

    /// Called once the underlying byte stream ends without a `[DONE]`
    /// frame; closes out any still-open tool calls.
    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.drain_tool_calls(&mut events);
        events.push(StreamEvent::Done { stop_reason: None });
        events
    }
}

fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::Length,
        "tool_calls" => StopReason::ToolCalls,
        "content_filter" => StopReason::ContentFilter,
        "stop" => StopReason::Stop,
        _ => StopReason::Other,
    }
}

fn completion_to_message(choice: OpenAiChoice) -> (Message, StopReason) {
    let stop_reason = choice
        .finish_reason
        .as_deref()
        .map(map_finish_reason)
        .unwrap_or(StopReason::Stop);

    if let Some(tool_calls) = choice.message.tool_calls {
        let calls: Vec<ToolCall> = tool_calls
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();
        let text = choice.message.content.unwrap_or_default();
        return (Message::assistant_with_tools(text, calls), stop_reason);
    }

    (
        Message::assistant(choice.message.content.unwrap_or_default()),
        stop_reason,
    )
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: OpenAiUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamEvent {
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, ToolCall};

    #[test]
    fn convert_message_plain_text() {
        let msg = Message::user("hello");
        let converted = convert_message(&msg);
        assert_eq!(converted["role"], "user");
        assert_eq!(converted["content"], "hello");
    }

    #[test]
    fn convert_message_with_tool_calls_has_null_content_when_empty() {
        let msg = Message::assistant_with_tools("", vec![ToolCall::new("t1", "bash")]);
        let converted = convert_message(&msg);
        assert_eq!(converted["role"], "assistant");
        assert!(converted["content"].is_null());
        assert_eq!(converted["tool_calls"][0]["id"], "t1");
    }

    #[test]
    fn map_finish_reason_covers_known_values() {
        assert_eq!(map_finish_reason("stop"), StopReason::Stop);
        assert_eq!(map_finish_reason("tool_calls"), StopReason::ToolCalls);
        assert_eq!(map_finish_reason("length"), StopReason::Length);
        assert_eq!(map_finish_reason("content_filter"), StopReason::ContentFilter);
        assert_eq!(map_finish_reason("weird"), StopReason::Other);
    }

    fn content_frame(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    fn text_deltas(events: &[StreamEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn sse_reassembly_tolerates_a_split_invalid_frame_between_valid_ones() {
        let mut aggregator = SseAggregator::default();
        let mut all_events = Vec::new();

        let (events, done) = aggregator.push(&content_frame("Hel"));
        assert!(!done);
        all_events.extend(events);

        // An unparseable frame, itself delivered split across two chunks.
        let (events, done) = aggregator.push("data: not json");
        assert!(!done);
        all_events.extend(events);
        let (events, done) = aggregator.push("\n\n");
        assert!(!done);
        all_events.extend(events);

        let (events, done) = aggregator.push(&content_frame("lo"));
        assert!(!done);
        all_events.extend(events);

        assert_eq!(text_deltas(&all_events), vec!["Hel", "lo"]);
    }

    #[test]
    fn leading_newline_only_fragments_are_dropped_until_real_content_arrives() {
        let mut aggregator = SseAggregator::default();
        let mut all_events = Vec::new();

        for text in ["\n", "\n", "Hel", "\n", "lo"] {
            let (events, done) = aggregator.push(&content_frame(text));
            assert!(!done);
            all_events.extend(events);
        }

        assert_eq!(text_deltas(&all_events), vec!["Hel", "\n", "lo"]);
    }

    #[test]
    fn tool_call_deltas_sharing_an_index_but_differing_id_stay_distinct() {
        let mut aggregator = SseAggregator::default();
        let mut all_events = Vec::new();

        let first = serde_json::json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "id": "call-1", "function": {"name": "glob", "arguments": "{\"pat"}}
        ]}}]});
        let second = serde_json::json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "id": "call-2", "function": {"name": "bash", "arguments": "{\"cmd"}}
        ]}}]});

        let (events, done) = aggregator.push(&format!("data: {first}\n\n"));
        assert!(!done);
        all_events.extend(events);
        let (events, done) = aggregator.push(&format!("data: {second}\n\n"));
        assert!(!done);
        all_events.extend(events);

        assert_eq!(aggregator.tool_calls.len(), 2, "distinct ids at the same index must not merge");
        assert_eq!(aggregator.tool_calls[0].id.as_deref(), Some("call-1"));
        assert_eq!(aggregator.tool_calls[0].arguments, "{\"pat");
        assert_eq!(aggregator.tool_calls[1].id.as_deref(), Some("call-2"));
        assert_eq!(aggregator.tool_calls[1].arguments, "{\"cmd");

        let starts: Vec<(&str, &str)> = all_events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ToolCallStart { id, name } => Some((id.as_str(), name.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![("call-1", "glob"), ("call-2", "bash")]);
    }
}
