//! Static model-limits fallback map, used by the context-window watchdog
//! when a provider's `getModels` is unavailable.

/// A model's declared resource limits.
#[derive(Debug, Clone, Copy)]
pub struct ModelLimits {
    /// Maximum input size, in tokens.
    pub context_window: u32,
}

/// Known context windows for common models, used when a provider declares
/// `models = false` or `getModels` fails.
const FALLBACK_TABLE: &[(&str, u32)] = &[
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
    ("o1", 200_000),
    ("o1-mini", 128_000),
    ("claude-3-5-sonnet-20241022", 200_000),
    ("claude-3-5-haiku-20241022", 200_000),
    ("claude-3-opus-20240229", 200_000),
    ("claude-sonnet-4-20250514", 200_000),
];

/// Look up the fallback context window for a model id. Matching is by exact
/// id, falling back to a prefix match so dated model ids (e.g.
/// `gpt-4o-2024-08-06`) still resolve.
#[must_use]
pub fn fallback_context_window(model: &str) -> Option<ModelLimits> {
    FALLBACK_TABLE
        .iter()
        .find(|(id, _)| *id == model)
        .or_else(|| FALLBACK_TABLE.iter().find(|(id, _)| model.starts_with(id)))
        .map(|(_, window)| ModelLimits {
            context_window: *window,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert_eq!(fallback_context_window("gpt-4o").unwrap().context_window, 128_000);
    }

    #[test]
    fn prefix_match_for_dated_ids() {
        assert_eq!(
            fallback_context_window("claude-3-5-sonnet-20241022-v2")
                .unwrap()
                .context_window,
            200_000
        );
    }

    #[test]
    fn unknown_model_returns_none() {
        assert!(fallback_context_window("totally-unknown-model").is_none());
    }
}
