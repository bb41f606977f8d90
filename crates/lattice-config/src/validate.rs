//! Validation of a loaded [`AgentConfig`].

use crate::error::ConfigError;
use crate::types::AgentConfig;

/// Validate an agent configuration, per SPEC_FULL.md's ambient-config section.
pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.model.trim().is_empty() {
        return Err(ConfigError::Invalid("model must not be empty".to_string()));
    }
    if config.max_tool_concurrency < 1 {
        return Err(ConfigError::Invalid(
            "maxToolConcurrency must be >= 1".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Invalid(
            "temperature must be in [0, 2]".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.top_p) {
        return Err(ConfigError::Invalid("topP must be in [0, 1]".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AgentConfig {
        AgentConfig {
            model: "gpt-4o".to_string(),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn accepts_default_shaped_config() {
        assert!(validate(&valid()).is_ok());
    }

    #[test]
    fn rejects_empty_model() {
        let mut cfg = valid();
        cfg.model.clear();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut cfg = valid();
        cfg.max_tool_concurrency = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut cfg = valid();
        cfg.temperature = 3.0;
        assert!(validate(&cfg).is_err());
    }
}
