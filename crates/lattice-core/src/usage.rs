//! Token usage, shared by the LLM adapter, the event port, and metrics.

use serde::{Deserialize, Serialize};

/// Usage for a single completion request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input/prompt tokens.
    pub prompt_tokens: u64,
    /// Output/completion tokens.
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u64,
    /// Tokens served from provider-side cache, if reported.
    pub cached_tokens: Option<u64>,
    /// Anthropic-style cache-creation tokens, if reported.
    pub cache_creation_input_tokens: Option<u64>,
    /// Anthropic-style cache-read tokens, if reported.
    pub cache_read_input_tokens: Option<u64>,
}

impl Usage {
    /// Build usage from prompt/completion token counts, deriving `total_tokens`.
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            cached_tokens: None,
            cache_creation_input_tokens: None,
            cache_read_input_tokens: None,
        }
    }

    /// Merge another usage observation into this one, taking the later value
    /// for each field that is present (used when usage is split across SSE
    /// frames).
    #[must_use]
    pub fn merged_with(self, other: Usage) -> Usage {
        Usage {
            prompt_tokens: if other.prompt_tokens > 0 {
                other.prompt_tokens
            } else {
                self.prompt_tokens
            },
            completion_tokens: if other.completion_tokens > 0 {
                other.completion_tokens
            } else {
                self.completion_tokens
            },
            total_tokens: if other.total_tokens > 0 {
                other.total_tokens
            } else {
                self.total_tokens
            },
            cached_tokens: other.cached_tokens.or(self.cached_tokens),
            cache_creation_input_tokens: other
                .cache_creation_input_tokens
                .or(self.cache_creation_input_tokens),
            cache_read_input_tokens: other
                .cache_read_input_tokens
                .or(self.cache_read_input_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_total() {
        let u = Usage::new(10, 5);
        assert_eq!(u.total_tokens, 15);
    }

    #[test]
    fn merge_prefers_nonzero_other() {
        let a = Usage::new(10, 5);
        let b = Usage {
            cached_tokens: Some(3),
            ..Usage::default()
        };
        let merged = a.merged_with(b);
        assert_eq!(merged.prompt_tokens, 10);
        assert_eq!(merged.cached_tokens, Some(3));
    }
}
