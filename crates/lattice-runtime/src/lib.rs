//! Lattice Runtime — conversation storage, session metrics, and the agent
//! orchestrator that ties the LLM adapter and tool port into one streaming
//! turn, plus the manager that runs it across a session's lifetime.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod conversation;
mod delegation;
mod error;
mod manager;
mod metrics;
mod orchestrator;

pub use conversation::{ContextWindowSnapshot, ConversationMetadata, ConversationSnapshot, ConversationStore, ConversationView, RequestMetrics, SnapshotEntry};
pub use delegation::{AgentRoster, OrchestratorDelegationBackend};
pub use error::{RuntimeError, RuntimeResult};
pub use manager::{ManagerConfig, OrchestratorManager};
pub use metrics::{MetricsBucket, MetricsSnapshot};
pub use orchestrator::{render_system_prompt, Orchestrator, TurnOutcome, TurnState};
