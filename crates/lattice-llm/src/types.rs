//! Core message/tool-call data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who sent a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// End-user input.
    User,
    /// LLM output.
    Assistant,
    /// A tool's result fed back to the LLM.
    Tool,
}

/// One part of a multi-part message: text, an image URL, or a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An image referenced by URL or data URI.
    ImageUrl {
        /// The URL or `data:` URI.
        url: String,
    },
    /// A file attachment.
    File {
        /// File name.
        name: String,
        /// MIME type.
        media_type: String,
        /// Base64-encoded contents.
        data: String,
    },
}

/// A message's content: either plain text or an ordered sequence of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Ordered multi-part content.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Extract the flattened text of this content (concatenating any
    /// `Text` parts), or an empty string if there is none.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Whether this content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(t) => t.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }
}

/// A tool call requested by an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within a response.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Serialized JSON arguments text (not yet decoded).
    pub arguments: String,
}

impl ToolCall {
    /// Build a tool call with empty arguments, to be filled in as streaming
    /// deltas arrive.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: String::new(),
        }
    }

    /// Decode `arguments` as a JSON object, defaulting to `{}` on parse failure.
    #[must_use]
    pub fn parsed_arguments(&self) -> Value {
        serde_json::from_str(&self.arguments).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// The result of executing a [`ToolCall`], fed back as a tool-role message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Matches the originating [`ToolCall::id`].
    pub call_id: String,
    /// Result text (error text, if the call failed).
    pub content: String,
    /// Whether this result represents a failure.
    pub is_error: bool,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Opaque id, stable identity.
    pub id: String,
    /// Sender role.
    pub role: MessageRole,
    /// Content.
    pub content: MessageContent,
    /// Tool calls requested (assistant only).
    pub tool_calls: Option<Vec<ToolCall>>,
    /// The tool call this message answers (tool role only).
    pub tool_call_id: Option<String>,
    /// Tool name (tool role only, mirrors `tool_call_id`'s call).
    pub name: Option<String>,
    /// ISO-8601 timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Message {
    fn base(role: MessageRole, content: MessageContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Build a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::base(MessageRole::User, MessageContent::Text(text.into()))
    }

    /// Build a system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::base(MessageRole::System, MessageContent::Text(text.into()))
    }

    /// Build an assistant message with plain text content.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::base(MessageRole::Assistant, MessageContent::Text(text.into()))
    }

    /// Build an assistant message carrying tool calls (content may be empty).
    #[must_use]
    pub fn assistant_with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::base(MessageRole::Assistant, MessageContent::Text(text.into()));
        msg.tool_calls = Some(tool_calls);
        msg
    }

    /// Build a tool-role message answering one tool call.
    #[must_use]
    pub fn tool_result(result: &ToolCallResult, name: impl Into<String>) -> Self {
        let mut msg = Self::base(
            MessageRole::Tool,
            MessageContent::Text(result.content.clone()),
        );
        msg.tool_call_id = Some(result.call_id.clone());
        msg.name = Some(name.into());
        msg
    }

    /// Flattened text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// A tool definition offered to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
}

/// Why a stream stopped (maps to `finish_reason`/`stop_reason` across providers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a complete response with no further tool calls.
    Stop,
    /// The model stopped because it wants to call one or more tools.
    ToolCalls,
    /// The model hit `maxTokens`.
    Length,
    /// The provider's content filter triggered.
    ContentFilter,
    /// A provider value this adapter does not recognize.
    Other,
}

/// An incremental streaming event from [`crate::LlmProvider::stream`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A content fragment.
    TextDelta(String),
    /// A new tool call began.
    ToolCallStart {
        /// Tool call id.
        id: String,
        /// Tool name.
        name: String,
    },
    /// An arguments fragment for an open tool call.
    ToolCallDelta {
        /// Tool call id.
        id: String,
        /// Fragment of the arguments JSON text.
        args_delta: String,
    },
    /// A tool call's arguments are complete.
    ToolCallEnd {
        /// Tool call id.
        id: String,
    },
    /// A reasoning/thinking fragment (opaque; forwarded, not parsed).
    ReasoningDelta(String),
    /// Usage observed mid-stream.
    Usage(lattice_core::Usage),
    /// The stream is finished.
    Done {
        /// The provider's stop reason, if known.
        stop_reason: Option<StopReason>,
    },
    /// An error occurred mid-stream.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_of_parts_concatenates_text_parts_only() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "a".to_string(),
            },
            ContentPart::ImageUrl {
                url: "http://x".to_string(),
            },
            ContentPart::Text {
                text: "b".to_string(),
            },
        ]);
        assert_eq!(content.text(), "ab");
    }

    #[test]
    fn parsed_arguments_falls_back_to_empty_object_on_invalid_json() {
        let call = ToolCall {
            id: "t1".to_string(),
            name: "bash".to_string(),
            arguments: "not json".to_string(),
        };
        assert_eq!(call.parsed_arguments(), serde_json::json!({}));
    }

    #[test]
    fn tool_result_message_carries_call_id_and_name() {
        let result = ToolCallResult {
            call_id: "t1".to_string(),
            content: "ok".to_string(),
            is_error: false,
        };
        let msg = Message::tool_result(&result, "bash");
        assert_eq!(msg.tool_call_id.as_deref(), Some("t1"));
        assert_eq!(msg.name.as_deref(), Some("bash"));
        assert_eq!(msg.role, MessageRole::Tool);
    }
}
