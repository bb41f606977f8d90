#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Tool-approval gating used when a conversation is configured with
//! `requireToolApproval=true`.
//!
//! This is intentionally thin: one trait and two reference policies. A
//! deployment that wants interactive approval, budget tracking, or
//! cryptographic proof-of-approval implements [`lattice_tools::ApprovalPort`]
//! itself and plugs it into the same seam.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::warn;

pub use lattice_tools::{ApprovalPort, AutoApprove, PendingToolCall};

/// Denies every tool call unconditionally.
///
/// The conservative default for a deployment that enables
/// `requireToolApproval` without wiring up a real approval channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl ApprovalPort for DenyAll {
    async fn approve(&self, call: &PendingToolCall) -> bool {
        warn!(tool = %call.name, call_id = %call.call_id, "denied: no approval channel configured");
        false
    }
}

/// Approves calls to a fixed set of tool names and denies everything else.
pub struct AllowListApproval {
    allowed: HashSet<String>,
}

impl AllowListApproval {
    /// Build an allow-list from tool names.
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { allowed: allowed.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
impl ApprovalPort for AllowListApproval {
    async fn approve(&self, call: &PendingToolCall) -> bool {
        let allowed = self.allowed.contains(&call.name);
        if !allowed {
            warn!(tool = %call.name, call_id = %call.call_id, "denied: not on the allow list");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str) -> PendingToolCall {
        PendingToolCall { call_id: "c1".to_string(), name: name.to_string(), arguments: serde_json::json!({}) }
    }

    #[tokio::test]
    async fn deny_all_rejects_every_call() {
        assert!(!DenyAll.approve(&call("bash")).await);
        assert!(!DenyAll.approve(&call("read_file")).await);
    }

    #[tokio::test]
    async fn allow_list_permits_only_listed_names() {
        let port = AllowListApproval::new(["read_file", "glob"]);
        assert!(port.approve(&call("read_file")).await);
        assert!(!port.approve(&call("bash")).await);
    }

    #[tokio::test]
    async fn auto_approve_is_reexported_for_convenience() {
        assert!(AutoApprove.approve(&call("bash")).await);
    }
}
