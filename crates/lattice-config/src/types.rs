//! Configuration data model: `AgentConfig`, `AuthMethod`, `ProviderConfig`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent identifier, used as the `agent` parameter of `assign_task`.
    pub id: String,
    /// System prompt template (rendered with the `RuntimeEnv` at turn start).
    pub system_prompt: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling parameter.
    pub top_p: f64,
    /// Optional max output tokens.
    pub max_tokens: Option<u32>,
    /// Tool names that may be offered to the LLM this turn.
    pub enabled_tools: HashSet<String>,
    /// Maximum number of tool calls executed concurrently within one batch.
    pub max_tool_concurrency: u32,
    /// Whether every tool call must be approved before dispatch.
    pub require_tool_approval: bool,
    /// Requested reasoning effort, if the provider supports it.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Opaque "thinking" budget hint, passed through verbatim to providers
    /// that accept it (open question #2 in SPEC_FULL.md).
    pub thinking_budget_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            system_prompt: String::new(),
            model: String::new(),
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: None,
            enabled_tools: HashSet::new(),
            max_tool_concurrency: 4,
            require_tool_approval: false,
            reasoning_effort: None,
            thinking_budget_tokens: None,
        }
    }
}

/// Requested reasoning effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Low effort.
    Low,
    /// Medium effort.
    Medium,
    /// High effort.
    High,
}

/// Credential variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Static API key.
    ApiKey {
        /// The key value.
        value: String,
    },
    /// OAuth access/refresh token pair.
    OAuth {
        /// Current access token.
        access: String,
        /// Refresh token.
        refresh: String,
        /// Unix-epoch seconds when `access` expires.
        expires: i64,
    },
    /// No authentication required.
    None,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("base_url", &self.base_url)
            .field("auth", &"<redacted>")
            .field("custom_headers", &self.custom_headers)
            .field("models", &self.models)
            .finish()
    }
}

/// Which of the two wire protocols this provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    /// OpenAI-compatible `/chat/completions` SSE.
    OpenaiCompat,
    /// Anthropic messages API.
    Anthropic,
}

/// How a provider's model list should be obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelsDescriptor {
    /// `false` — listing is unsupported.
    Unsupported(bool),
    /// A custom listing endpoint path.
    Endpoint(String),
    /// A static, literal list of model ids.
    Static(Vec<String>),
}

/// Provider connection configuration.
///
/// `Debug` redacts `auth` so credentials never leak into logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which wire protocol this provider speaks.
    pub provider_type: ProviderType,
    /// Base URL of the API.
    pub base_url: String,
    /// Credentials.
    pub auth: AuthMethod,
    /// Extra headers sent on every request.
    pub custom_headers: Option<Value>,
    /// How to obtain the model list, if at all.
    pub models: Option<ModelsDescriptor>,
}
