//! Lattice Test — shared test utilities for the lattice agent orchestrator.
//!
//! This crate provides a scripted [`lattice_llm::LlmProvider`], an event
//! recorder, and common fixtures, for use as a dev-dependency across the
//! workspace.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! lattice-test = { path = "../lattice-test" }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod events;
mod fixtures;
mod llm;

pub use events::EventRecorder;
pub use fixtures::{test_agent_config, test_conversation_id, test_model_info, test_session_id};
pub use llm::{completion_result, error_response, fragmented_text_response, text_response, tool_call_response, ScriptedLlmProvider};
