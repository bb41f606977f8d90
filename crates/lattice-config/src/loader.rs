//! Minimal single-file TOML loader for [`AgentConfig`].

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::types::AgentConfig;
use crate::validate::validate;

/// Load and validate an [`AgentConfig`] from a single TOML file.
///
/// This intentionally does not resolve profiles, scopes, or directory
/// layering; it only turns one resolved document into a typed, validated
/// config.
pub fn load_agent_config(path: &Path) -> ConfigResult<AgentConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: AgentConfig = toml::from_str(&text)?;
    validate(&config)?;
    tracing::debug!(path = %path.display(), id = %config.id, "loaded agent config");
    Ok(config)
}
