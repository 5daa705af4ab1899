//! Seam to the remote relational-store-as-a-service.
//!
//! The rest of the core holds an `Arc<dyn DataStore>` and never sees the
//! transport. Methods are typed per domain, but each is one of the store's
//! abstract operations: filtered/ordered/capped reads, a conflict-keyed
//! upsert, targeted updates, single-row inserts, and per-topic change
//! subscriptions with at-least-once, possibly-coalesced delivery.

pub mod memory;
pub mod records;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::{Client, Conversation, Message, SenderRole, TypingSignal};

pub use memory::MemoryStore;
pub use records::{CalendarRow, CheckInRow, HabitRow, WorkoutRow};

/// One change-feed scope. Subscriptions are per-topic; there is no ordering
/// guarantee across distinct topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The conversation list of one workspace.
    Conversations { workspace_id: String },
    /// The message list of one conversation.
    Messages { conversation_id: String },
    /// Typing presence within one conversation.
    Typing { conversation_id: String },
}

/// A change notification. Durable topics only signal "something changed" -
/// subscribers refetch through the normal read path. Typing carries its
/// payload inline because presence is never persisted and cannot be read
/// back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Changed { topic: Topic },
    Typing(TypingSignal),
}

#[async_trait]
pub trait DataStore: Send + Sync {
    // ===== Conversations =====

    async fn find_conversation(
        &self,
        workspace_id: &str,
        client_id: &str,
    ) -> Result<Option<Conversation>, StoreError>;

    async fn conversations_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<Conversation>, StoreError>;

    /// Insert-or-fetch keyed on the `(workspace_id, client_id)` unique
    /// constraint. Concurrent calls for the same pair all return the same
    /// winning row.
    async fn upsert_conversation(
        &self,
        record: Conversation,
    ) -> Result<Conversation, StoreError>;

    /// Bump `last_message_at` on an accepted outbound message.
    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message_at: u64,
    ) -> Result<(), StoreError>;

    // ===== Messages =====

    /// All messages of one conversation, created_at ascending.
    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, StoreError>;

    async fn insert_message(&self, message: Message) -> Result<(), StoreError>;

    /// Bulk-clear the unread flag on messages authored by `sender_role`.
    /// Returns the number of rows actually cleared.
    async fn mark_messages_read(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
    ) -> Result<usize, StoreError>;

    // ===== Presence =====

    /// Latest-wins publish keyed on `(conversation_id, actor_id)`. Fans out
    /// to typing-topic subscribers; nothing is persisted.
    async fn publish_typing(&self, signal: TypingSignal) -> Result<(), StoreError>;

    // ===== Roster =====

    async fn clients_for_workspace(&self, workspace_id: &str) -> Result<Vec<Client>, StoreError>;

    // ===== Activity domain reads =====
    // Each is scoped to a workspace, bounded by a time window and a row cap.

    /// Client-authored messages with `created_at >= since`.
    async fn recent_inbound_messages(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    async fn recent_workouts(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<WorkoutRow>, StoreError>;

    async fn recent_habit_logs(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<HabitRow>, StoreError>;

    async fn recent_checkins(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<CheckInRow>, StoreError>;

    /// Calendar entries with `from <= starts_at <= until`.
    async fn upcoming_calendar_events(
        &self,
        workspace_id: &str,
        from: u64,
        until: u64,
        limit: usize,
    ) -> Result<Vec<CalendarRow>, StoreError>;

    // ===== Change feed =====

    /// Subscribe to one topic. Delivery is at-least-once and may coalesce
    /// under load; the polling schedulers compensate for drops.
    fn subscribe(&self, topic: Topic) -> mpsc::UnboundedReceiver<ChangeEvent>;
}
