//! Conversation store (L3): an ordered message list per conversation id,
//! layered with metadata, with durable snapshot export/import.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lattice_core::{ConversationId, Usage};
use lattice_llm::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The most recent request's context-window accounting for a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextWindowSnapshot {
    /// The model's declared context window, in tokens.
    pub limit: u32,
    /// Prompt tokens on the most recent request.
    pub prompt_tokens: u64,
    /// Completion tokens on the most recent request.
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u64,
}

/// Metadata layered over a conversation's message list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMetadata {
    /// Short topic summary, maintained by the orchestrator manager.
    #[serde(default)]
    pub topic: Option<String>,
    /// When the conversation was first created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recently appended message.
    pub updated_at: DateTime<Utc>,
    /// `len(messages)` as of the last mutation.
    pub message_count: usize,
    /// Cumulative prompt tokens across every `recordRequestMetrics` call.
    #[serde(default)]
    pub cumulative_prompt_tokens: u64,
    /// Cumulative completion tokens across every `recordRequestMetrics` call.
    #[serde(default)]
    pub cumulative_completion_tokens: u64,
    /// Cumulative total tokens across every `recordRequestMetrics` call.
    #[serde(default)]
    pub cumulative_total_tokens: u64,
    /// Most recent request's context-window accounting, replaced (not
    /// accumulated) on every call.
    #[serde(default)]
    pub context_window: Option<ContextWindowSnapshot>,
    /// Cumulative tool calls made while producing this conversation.
    #[serde(default)]
    pub tool_calls: u64,
    /// Cumulative LLM response time, in milliseconds.
    #[serde(default)]
    pub response_time_ms: u64,
    /// Cumulative cost in the provider's billing currency.
    #[serde(default)]
    pub cost: f64,
}

impl ConversationMetadata {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            topic: None,
            created_at: now,
            updated_at: now,
            message_count: 0,
            cumulative_prompt_tokens: 0,
            cumulative_completion_tokens: 0,
            cumulative_total_tokens: 0,
            context_window: None,
            tool_calls: 0,
            response_time_ms: 0,
            cost: 0.0,
        }
    }

    /// Synthesize metadata for a message list that was loaded without its
    /// own metadata row (e.g. a legacy snapshot).
    #[must_use]
    pub fn synthesize(messages: &[Message]) -> Self {
        let created_at = messages.first().map_or_else(Utc::now, |m| m.timestamp);
        let updated_at = messages.last().map_or(created_at, |m| m.timestamp);
        Self { message_count: messages.len(), ..Self::new(created_at).with_updated(updated_at) }
    }

    fn with_updated(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// One request's worth of metrics, fed into
/// [`ConversationStore::record_request_metrics`].
#[derive(Debug, Clone, Copy)]
pub struct RequestMetrics {
    /// Token usage for this request.
    pub usage: Usage,
    /// The model's context window, if known, for the replaced snapshot.
    pub context_window_limit: Option<u32>,
    /// Wall-clock time this request took.
    pub response_time_ms: u64,
    /// Cost of this request, if computed.
    pub cost: f64,
}

#[derive(Debug, Clone)]
struct ConversationEntry {
    messages: Vec<Message>,
    metadata: ConversationMetadata,
}

/// A conversation's messages together with its metadata, as returned by
/// [`ConversationStore::get_conversation`].
#[derive(Debug, Clone)]
pub struct ConversationView {
    /// The conversation's messages, in causal order.
    pub messages: Vec<Message>,
    /// Its metadata (synthesized if no metadata was ever recorded).
    pub metadata: ConversationMetadata,
}

/// A durable, JSON-serializable copy of every conversation, produced by
/// [`ConversationStore::export_snapshot`] and consumed by
/// [`ConversationStore::import_snapshot`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// Conversation id (as a string, for JSON map keys) to its view.
    pub conversations: HashMap<String, SnapshotEntry>,
}

/// One conversation's persisted state within a [`ConversationSnapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// The conversation's messages.
    pub messages: Vec<Message>,
    /// Its metadata, if one was ever recorded.
    #[serde(default)]
    pub metadata: Option<ConversationMetadata>,
}

/// In-memory conversation store. Every conversation's entry is independently
/// locked so concurrent appends to different conversations never block each
/// other; within one conversation, append-then-metadata-update is atomic.
#[derive(Default)]
pub struct ConversationStore {
    entries: RwLock<HashMap<ConversationId, Arc<tokio::sync::Mutex<ConversationEntry>>>>,
}

impl ConversationStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry_for(&self, id: &ConversationId) -> Arc<tokio::sync::Mutex<ConversationEntry>> {
        if let Some(entry) = self.entries.read().await.get(id) {
            return Arc::clone(entry);
        }
        let mut entries = self.entries.write().await;
        Arc::clone(
            entries
                .entry(id.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(ConversationEntry { messages: Vec::new(), metadata: ConversationMetadata::new(Utc::now()) }))),
        )
    }

    /// Raw message list for `id`, or `None` if the conversation has never
    /// been touched.
    pub async fn get(&self, id: &ConversationId) -> Option<Vec<Message>> {
        let entries = self.entries.read().await;
        let entry = entries.get(id)?;
        Some(entry.lock().await.messages.clone())
    }

    /// Replace a conversation's entire message list, re-synthesizing
    /// metadata's `message_count`/`updated_at`.
    pub async fn set(&self, id: ConversationId, messages: Vec<Message>) {
        let slot = self.entry_for(&id).await;
        let mut entry = slot.lock().await;
        entry.metadata.message_count = messages.len();
        entry.metadata.updated_at = messages.last().map_or_else(Utc::now, |m| m.timestamp);
        entry.messages = messages;
    }

    /// Append messages under the per-conversation lock, updating
    /// `updatedAt`/`messageCount` atomically with the append.
    pub async fn append(&self, id: &ConversationId, msgs: Vec<Message>) {
        if msgs.is_empty() {
            return;
        }
        let slot = self.entry_for(id).await;
        let mut entry = slot.lock().await;
        entry.messages.extend(msgs);
        entry.metadata.message_count = entry.messages.len();
        entry.metadata.updated_at = entry.messages.last().map_or_else(Utc::now, |m| m.timestamp);
    }

    /// Delete a conversation entirely.
    pub async fn delete(&self, id: &ConversationId) {
        self.entries.write().await.remove(id);
    }

    /// All known conversation ids.
    pub async fn keys(&self) -> Vec<ConversationId> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Alias of [`Self::keys`], matching the memory-port contract's naming.
    pub async fn list_conversations(&self) -> Vec<ConversationId> {
        self.keys().await
    }

    /// Drop every conversation.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Fetch a conversation's messages and metadata together.
    pub async fn get_conversation(&self, id: &ConversationId) -> ConversationView {
        let entries = self.entries.read().await;
        match entries.get(id) {
            Some(entry) => {
                let entry = entry.lock().await;
                ConversationView { messages: entry.messages.clone(), metadata: entry.metadata.clone() }
            },
            None => ConversationView { messages: Vec::new(), metadata: ConversationMetadata::new(Utc::now()) },
        }
    }

    /// Update a conversation's topic, bumping `updatedAt`.
    pub async fn update_topic(&self, id: &ConversationId, topic: impl Into<String>) {
        let slot = self.entry_for(id).await;
        let mut entry = slot.lock().await;
        entry.metadata.topic = Some(topic.into());
        entry.metadata.updated_at = Utc::now();
    }

    /// Fold one request's metrics into the conversation's cumulative
    /// counters and replace its context-window snapshot.
    pub async fn record_request_metrics(&self, id: &ConversationId, m: RequestMetrics) {
        let slot = self.entry_for(id).await;
        let mut entry = slot.lock().await;
        entry.metadata.cumulative_prompt_tokens = entry.metadata.cumulative_prompt_tokens.saturating_add(m.usage.prompt_tokens);
        entry.metadata.cumulative_completion_tokens =
            entry.metadata.cumulative_completion_tokens.saturating_add(m.usage.completion_tokens);
        entry.metadata.cumulative_total_tokens = entry.metadata.cumulative_total_tokens.saturating_add(m.usage.total_tokens);
        entry.metadata.tool_calls = entry.metadata.tool_calls.saturating_add(1);
        entry.metadata.response_time_ms = entry.metadata.response_time_ms.saturating_add(m.response_time_ms);
        entry.metadata.cost += m.cost;
        if let Some(limit) = m.context_window_limit {
            entry.metadata.context_window = Some(ContextWindowSnapshot {
                limit,
                prompt_tokens: m.usage.prompt_tokens,
                completion_tokens: m.usage.completion_tokens,
                total_tokens: m.usage.total_tokens,
            });
        }
    }

    /// Export every conversation as a JSON-serializable snapshot.
    pub async fn export_snapshot(&self) -> ConversationSnapshot {
        let entries = self.entries.read().await;
        let mut conversations = HashMap::with_capacity(entries.len());
        for (id, entry) in entries.iter() {
            let entry = entry.lock().await;
            conversations.insert(id.as_str().to_string(), SnapshotEntry { messages: entry.messages.clone(), metadata: Some(entry.metadata.clone()) });
        }
        ConversationSnapshot { conversations }
    }

    /// Replace every conversation with the contents of a snapshot,
    /// synthesizing metadata for any entry that predates metadata tracking.
    pub async fn import_snapshot(&self, snapshot: ConversationSnapshot) {
        let mut entries = self.entries.write().await;
        entries.clear();
        for (id, snapshot_entry) in snapshot.conversations {
            let metadata = snapshot_entry.metadata.unwrap_or_else(|| ConversationMetadata::synthesize(&snapshot_entry.messages));
            entries.insert(
                ConversationId::from_string(id),
                Arc::new(tokio::sync::Mutex::new(ConversationEntry { messages: snapshot_entry.messages, metadata })),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_updates_message_count_and_timestamp() {
        let store = ConversationStore::new();
        let id = ConversationId::new();
        store.append(&id, vec![Message::user("hi")]).await;
        store.append(&id, vec![Message::assistant("hello")]).await;

        let view = store.get_conversation(&id).await;
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.metadata.message_count, 2);
    }

    #[tokio::test]
    async fn missing_conversation_has_empty_synthesized_view() {
        let store = ConversationStore::new();
        let id = ConversationId::new();
        let view = store.get_conversation(&id).await;
        assert!(view.messages.is_empty());
        assert_eq!(view.metadata.message_count, 0);
    }

    #[tokio::test]
    async fn list_conversations_reports_every_touched_id_and_only_those() {
        let store = ConversationStore::new();
        let a = ConversationId::new();
        let b = ConversationId::new();
        store.append(&a, vec![Message::user("x")]).await;
        store.append(&b, vec![Message::user("y")]).await;

        let mut ids = store.list_conversations().await;
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn record_request_metrics_accumulates_and_replaces_context_window() {
        let store = ConversationStore::new();
        let id = ConversationId::new();

        store
            .record_request_metrics(&id, RequestMetrics { usage: Usage::new(100, 50), context_window_limit: Some(200_000), response_time_ms: 10, cost: 0.01 })
            .await;
        store
            .record_request_metrics(&id, RequestMetrics { usage: Usage::new(10, 5), context_window_limit: Some(200_000), response_time_ms: 5, cost: 0.001 })
            .await;

        let view = store.get_conversation(&id).await;
        assert_eq!(view.metadata.cumulative_prompt_tokens, 110);
        assert_eq!(view.metadata.tool_calls, 2);
        assert_eq!(view.metadata.context_window.unwrap().prompt_tokens, 10);
    }

    #[tokio::test]
    async fn export_import_round_trips_messages_and_metadata() {
        let store = ConversationStore::new();
        let id = ConversationId::new();
        store.append(&id, vec![Message::user("hi"), Message::assistant("hello")]).await;
        store.update_topic(&id, "greeting").await;

        let snapshot = store.export_snapshot().await;

        let restored = ConversationStore::new();
        restored.import_snapshot(snapshot).await;

        let view = restored.get_conversation(&id).await;
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.metadata.topic.as_deref(), Some("greeting"));
    }

    #[tokio::test]
    async fn importing_a_metadata_free_snapshot_synthesizes_it() {
        let mut conversations = HashMap::new();
        conversations.insert("conv-1".to_string(), SnapshotEntry { messages: vec![Message::user("hi")], metadata: None });
        let snapshot = ConversationSnapshot { conversations };

        let store = ConversationStore::new();
        store.import_snapshot(snapshot).await;

        let view = store.get_conversation(&ConversationId::from_string("conv-1")).await;
        assert_eq!(view.metadata.message_count, 1);
    }
}
