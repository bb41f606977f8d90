//! Per-`send`-call tracing context.

use chrono::{DateTime, Utc};
use lattice_core::{ConversationId, SessionId};

/// Correlates every `tracing` event emitted during one `send` call.
///
/// Every component that performs I/O or a state transition during a turn
/// should log under this context's [`span`](RequestContext::span) so its
/// `session_id`/`conversation_id` fields show up on every event.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The session this turn belongs to.
    pub session_id: SessionId,
    /// The conversation this turn appends to.
    pub conversation_id: ConversationId,
    /// Component that opened this context (e.g. `"orchestrator"`, `"delegate"`).
    pub source: String,
    /// When the turn started.
    pub started_at: DateTime<Utc>,
}

impl RequestContext {
    /// Start a new context for a top-level `send` call.
    #[must_use]
    pub fn new(session_id: SessionId, conversation_id: ConversationId, source: impl Into<String>) -> Self {
        Self { session_id, conversation_id, source: source.into(), started_at: Utc::now() }
    }

    /// Start a context for a delegated child turn, inheriting the parent's
    /// conversation scope but running under its own session.
    #[must_use]
    pub fn child(&self, session_id: SessionId, source: impl Into<String>) -> Self {
        Self {
            session_id,
            conversation_id: self.conversation_id.clone(),
            source: source.into(),
            started_at: Utc::now(),
        }
    }

    /// Elapsed wall-clock time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    /// Elapsed time in milliseconds, for logging.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// Open a `tracing::Span` carrying the correlating fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "send",
            session_id = %self.session_id,
            conversation_id = %self.conversation_id,
            source = %self.source,
        )
    }
}

/// Guard that logs turn start/end, keeping the span entered until dropped.
pub struct RequestGuard {
    context: RequestContext,
    span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter `context`'s span and log the start of the turn.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("turn started");
        Self { context, span }
    }

    /// The context this guard wraps.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let _ = &self.span;
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "turn completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_context_inherits_conversation_but_not_session() {
        let parent = RequestContext::new(SessionId::new(), ConversationId::new(), "orchestrator");
        let child_session = SessionId::new();
        let child = parent.child(child_session.clone(), "delegate");

        assert_eq!(child.conversation_id, parent.conversation_id);
        assert_eq!(child.session_id, child_session);
        assert_eq!(child.source, "delegate");
    }

    #[test]
    fn elapsed_is_nonnegative_immediately_after_creation() {
        let ctx = RequestContext::new(SessionId::new(), ConversationId::new(), "orchestrator");
        assert!(ctx.elapsed_ms() >= 0);
    }

    #[test]
    fn guard_exposes_its_context() {
        let ctx = RequestContext::new(SessionId::new(), ConversationId::new(), "orchestrator");
        let session_id = ctx.session_id.clone();
        let guard = RequestGuard::new(ctx);
        assert_eq!(guard.context().session_id, session_id);
    }
}
