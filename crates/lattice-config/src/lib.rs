//! Lattice Config — `AgentConfig`/`ProviderConfig` data model,
//! a static model-limits fallback map, and a single-file TOML loader.
//!
//! The full layered, profile/scope-aware configuration directory loader is
//! out of scope; this crate only turns one resolved document
//! into the typed config the core needs.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod limits;
mod loader;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use limits::{ModelLimits, fallback_context_window};
pub use loader::load_agent_config;
pub use types::{AgentConfig, AuthMethod, ModelsDescriptor, ProviderConfig, ProviderType, ReasoningEffort};
pub use validate::validate;
