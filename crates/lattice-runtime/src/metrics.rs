//! Per-session metrics bucket (L5): ephemeral counters reset on every new
//! conversation, separate from the durable per-conversation counters in
//! [`crate::conversation`].

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use lattice_core::Usage;

/// A point-in-time read of a [`MetricsBucket`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Prompt tokens on the most recent LLM call.
    pub current_prompt_tokens: u64,
    /// Completion tokens on the most recent LLM call.
    pub current_completion_tokens: u64,
    /// Tokens served from cache on the most recent LLM call.
    pub current_cached_tokens: u64,
    /// `current_prompt_tokens + current_completion_tokens`.
    pub current_tokens: u64,
    /// Cumulative tokens across every LLM call this session.
    pub total_tokens: u64,
    /// Number of LLM calls made this session.
    pub llm_call_count: u64,
    /// Number of tool calls made this session.
    pub tool_call_count: u64,
    /// Cumulative cost this session.
    pub total_cost: f64,
    /// The active model's context window, if known.
    pub context_window_limit: Option<u32>,
    /// `current_tokens / context_window_limit`, if known.
    pub context_window_usage: Option<f64>,
}

/// Ephemeral, in-memory counters for one session's active conversation.
/// Safe to share across tasks: every mutator takes `&self`.
pub struct MetricsBucket {
    current_prompt_tokens: AtomicU64,
    current_completion_tokens: AtomicU64,
    current_cached_tokens: AtomicU64,
    total_tokens: AtomicU64,
    llm_call_count: AtomicU64,
    tool_call_count: AtomicU64,
    total_cost_micros: AtomicI64,
    context_window_limit: Mutex<Option<u32>>,
}

/// Cost is accumulated as fixed-point micro-units so concurrent adds stay
/// lock-free; converted back to `f64` only in [`MetricsBucket::get_snapshot`].
const COST_SCALE: f64 = 1_000_000.0;

impl Default for MetricsBucket {
    fn default() -> Self {
        Self {
            current_prompt_tokens: AtomicU64::new(0),
            current_completion_tokens: AtomicU64::new(0),
            current_cached_tokens: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
            llm_call_count: AtomicU64::new(0),
            tool_call_count: AtomicU64::new(0),
            total_cost_micros: AtomicI64::new(0),
            context_window_limit: Mutex::new(None),
        }
    }
}

impl MetricsBucket {
    /// Build a fresh, zeroed bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one LLM call's usage and (optional) cost.
    pub fn record_llm_call(&self, usage: Usage, cost: f64) {
        self.current_prompt_tokens.store(usage.prompt_tokens, Ordering::Relaxed);
        self.current_completion_tokens.store(usage.completion_tokens, Ordering::Relaxed);
        self.current_cached_tokens.store(usage.cached_tokens.unwrap_or(0), Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
        self.llm_call_count.fetch_add(1, Ordering::Relaxed);
        self.add_cost(cost);
    }

    /// Record one tool call having completed, regardless of outcome.
    pub fn record_tool_call(&self) {
        self.tool_call_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a `send` request completed; currently folds any
    /// additional cost (e.g. a provider surcharge) not already attributed
    /// to a specific LLM call.
    pub fn record_request_complete(&self, extra_cost: f64) {
        self.add_cost(extra_cost);
    }

    /// Set (or clear) the active model's context window, used to compute
    /// `context_window_usage` in snapshots.
    pub fn set_context_window(&self, limit: Option<u32>) {
        *self.context_window_limit.lock().expect("context window lock poisoned") = limit;
    }

    /// Zero every counter (used when starting a new conversation in the
    /// same session).
    pub fn reset(&self) {
        self.current_prompt_tokens.store(0, Ordering::Relaxed);
        self.current_completion_tokens.store(0, Ordering::Relaxed);
        self.current_cached_tokens.store(0, Ordering::Relaxed);
        self.total_tokens.store(0, Ordering::Relaxed);
        self.llm_call_count.store(0, Ordering::Relaxed);
        self.tool_call_count.store(0, Ordering::Relaxed);
        self.total_cost_micros.store(0, Ordering::Relaxed);
        *self.context_window_limit.lock().expect("context window lock poisoned") = None;
    }

    /// Take a consistent, copy-out snapshot of every counter.
    #[must_use]
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let current_prompt_tokens = self.current_prompt_tokens.load(Ordering::Relaxed);
        let current_completion_tokens = self.current_completion_tokens.load(Ordering::Relaxed);
        let current_tokens = current_prompt_tokens + current_completion_tokens;
        let context_window_limit = *self.context_window_limit.lock().expect("context window lock poisoned");
        let context_window_usage = context_window_limit
            .filter(|&limit| limit > 0)
            .map(|limit| f64::from(u32::try_from(current_tokens.min(u64::from(u32::MAX))).unwrap_or(u32::MAX)) / f64::from(limit));

        MetricsSnapshot {
            current_prompt_tokens,
            current_completion_tokens,
            current_cached_tokens: self.current_cached_tokens.load(Ordering::Relaxed),
            current_tokens,
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
            llm_call_count: self.llm_call_count.load(Ordering::Relaxed),
            tool_call_count: self.tool_call_count.load(Ordering::Relaxed),
            total_cost: self.total_cost_micros.load(Ordering::Relaxed) as f64 / COST_SCALE,
            context_window_limit,
            context_window_usage,
        }
    }

    fn add_cost(&self, cost: f64) {
        if cost == 0.0 {
            return;
        }
        let micros = (cost * COST_SCALE).round() as i64;
        self.total_cost_micros.fetch_add(micros, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_bucket_snapshots_to_all_zero() {
        let bucket = MetricsBucket::new();
        let snapshot = bucket.get_snapshot();
        assert_eq!(snapshot.total_tokens, 0);
        assert_eq!(snapshot.llm_call_count, 0);
        assert!(snapshot.context_window_limit.is_none());
    }

    #[test]
    fn record_llm_call_sets_current_and_accumulates_total() {
        let bucket = MetricsBucket::new();
        bucket.record_llm_call(Usage::new(100, 20), 0.01);
        bucket.record_llm_call(Usage::new(10, 5), 0.001);

        let snapshot = bucket.get_snapshot();
        assert_eq!(snapshot.current_prompt_tokens, 10);
        assert_eq!(snapshot.current_tokens, 15);
        assert_eq!(snapshot.total_tokens, 135);
        assert_eq!(snapshot.llm_call_count, 2);
        assert!((snapshot.total_cost - 0.011).abs() < 1e-9);
    }

    #[test]
    fn context_window_usage_divides_current_by_limit() {
        let bucket = MetricsBucket::new();
        bucket.set_context_window(Some(1000));
        bucket.record_llm_call(Usage::new(800, 50), 0.0);

        let snapshot = bucket.get_snapshot();
        assert_eq!(snapshot.context_window_limit, Some(1000));
        assert!((snapshot.context_window_usage.unwrap() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn reset_zeroes_every_counter() {
        let bucket = MetricsBucket::new();
        bucket.record_llm_call(Usage::new(100, 20), 1.0);
        bucket.record_tool_call();
        bucket.set_context_window(Some(500));

        bucket.reset();

        let snapshot = bucket.get_snapshot();
        assert_eq!(snapshot.total_tokens, 0);
        assert_eq!(snapshot.tool_call_count, 0);
        assert!(snapshot.context_window_limit.is_none());
    }
}
