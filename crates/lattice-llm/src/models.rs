//! Model discovery types.

use serde::{Deserialize, Serialize};

/// A model a provider reports as available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// The model id as the provider expects it in requests.
    pub id: String,
    /// A human-readable display name, if the provider supplies one.
    pub display_name: Option<String>,
    /// Context window in tokens, if known.
    pub context_window: Option<u32>,
}

/// Remove duplicate models by id, keeping the first occurrence.
///
/// Providers sometimes list the same model id twice (e.g. once from a
/// static list and once from a live `/models` fetch); order of the first
/// occurrence is preserved.
#[must_use]
pub fn dedup_models_by_id(models: Vec<ModelInfo>) -> Vec<ModelInfo> {
    let mut seen = std::collections::HashSet::new();
    models
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let models = vec![
            ModelInfo {
                id: "a".to_string(),
                display_name: Some("First A".to_string()),
                context_window: None,
            },
            ModelInfo {
                id: "b".to_string(),
                display_name: None,
                context_window: None,
            },
            ModelInfo {
                id: "a".to_string(),
                display_name: Some("Second A".to_string()),
                context_window: None,
            },
        ];
        let deduped = dedup_models_by_id(models);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].display_name.as_deref(), Some("First A"));
    }
}
