//! In-memory `DataStore`.
//!
//! Backs the core in tests and in offline/demo embeddings. Semantics mirror
//! the remote service: the conversation upsert is atomic on the
//! `(workspace_id, client_id)` unique constraint, reads are filtered and
//! capped, and change notifications fan out per topic.
//!
//! Test hooks: `fail_next` scripts one failure for a named operation, and
//! `delay_next` makes the next call to a named operation await a scripted
//! duration before touching data - enough to reproduce out-of-order
//! responses without a real network.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::records::{CalendarRow, CheckInRow, HabitRow, WorkoutRow};
use super::{ChangeEvent, DataStore, Topic};
use crate::error::StoreError;
use crate::models::{Client, Conversation, Message, SenderRole, TypingSignal};

#[derive(Default)]
struct Inner {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    clients: Vec<Client>,
    workouts: Vec<WorkoutRow>,
    habits: Vec<HabitRow>,
    checkins: Vec<CheckInRow>,
    calendar: Vec<CalendarRow>,

    subscribers: Vec<(Topic, mpsc::UnboundedSender<ChangeEvent>)>,

    // Test hooks, keyed by operation name.
    faults: HashMap<&'static str, VecDeque<StoreError>>,
    delays: HashMap<&'static str, VecDeque<Duration>>,
    call_counts: HashMap<&'static str, usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Seeding =====

    pub fn seed_client(&self, client: Client) {
        self.inner.lock().clients.push(client);
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.inner.lock().conversations.push(conversation);
    }

    pub fn seed_message(&self, message: Message) {
        self.inner.lock().messages.push(message);
    }

    pub fn seed_workout(&self, row: WorkoutRow) {
        self.inner.lock().workouts.push(row);
    }

    pub fn seed_habit_log(&self, row: HabitRow) {
        self.inner.lock().habits.push(row);
    }

    pub fn seed_checkin(&self, row: CheckInRow) {
        self.inner.lock().checkins.push(row);
    }

    pub fn seed_calendar_event(&self, row: CalendarRow) {
        self.inner.lock().calendar.push(row);
    }

    // ===== Test hooks =====

    /// Script the next call to `op` (trait method name) to fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: StoreError) {
        self.inner.lock().faults.entry(op).or_default().push_back(err);
    }

    /// Script the next call to `op` to sleep for `delay` before reading or
    /// writing any data.
    pub fn delay_next(&self, op: &'static str, delay: Duration) {
        self.inner
            .lock()
            .delays
            .entry(op)
            .or_default()
            .push_back(delay);
    }

    /// How many times `op` has been invoked.
    pub fn call_count(&self, op: &'static str) -> usize {
        self.inner.lock().call_counts.get(op).copied().unwrap_or(0)
    }

    /// Runs the scripted delay (outside the lock), then the scripted fault,
    /// for one operation invocation.
    async fn enter(&self, op: &'static str) -> Result<(), StoreError> {
        let delay = {
            let mut inner = self.inner.lock();
            *inner.call_counts.entry(op).or_insert(0) += 1;
            inner
                .delays
                .get_mut(op)
                .and_then(|queue| queue.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fault = self
            .inner
            .lock()
            .faults
            .get_mut(op)
            .and_then(|queue| queue.pop_front());
        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn notify(&self, topic: Topic, event: ChangeEvent) {
        let mut inner = self.inner.lock();
        inner
            .subscribers
            .retain(|(sub_topic, tx)| !(sub_topic == &topic && tx.send(event.clone()).is_err()));
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_conversation(
        &self,
        workspace_id: &str,
        client_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        self.enter("find_conversation").await?;
        let inner = self.inner.lock();
        Ok(inner
            .conversations
            .iter()
            .find(|c| c.workspace_id == workspace_id && c.client_id == client_id)
            .cloned())
    }

    async fn conversations_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<Conversation>, StoreError> {
        self.enter("conversations_for_workspace").await?;
        let inner = self.inner.lock();
        let mut list: Vec<Conversation> = inner
            .conversations
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(list)
    }

    async fn upsert_conversation(
        &self,
        record: Conversation,
    ) -> Result<Conversation, StoreError> {
        self.enter("upsert_conversation").await?;
        let winner = {
            let mut inner = self.inner.lock();
            // Conflict target (workspace_id, client_id): the existing row
            // wins and the candidate id is discarded, exactly like an
            // ON CONFLICT DO UPDATE .. RETURNING on the remote side.
            match inner
                .conversations
                .iter()
                .find(|c| {
                    c.workspace_id == record.workspace_id && c.client_id == record.client_id
                })
                .cloned()
            {
                Some(existing) => existing,
                None => {
                    inner.conversations.push(record.clone());
                    record
                }
            }
        };
        self.notify(
            Topic::Conversations {
                workspace_id: winner.workspace_id.clone(),
            },
            ChangeEvent::Changed {
                topic: Topic::Conversations {
                    workspace_id: winner.workspace_id.clone(),
                },
            },
        );
        Ok(winner)
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        last_message_at: u64,
    ) -> Result<(), StoreError> {
        self.enter("touch_conversation").await?;
        let workspace_id = {
            let mut inner = self.inner.lock();
            let conversation = inner
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)
                .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))?;
            conversation.last_message_at = conversation.last_message_at.max(last_message_at);
            conversation.workspace_id.clone()
        };
        self.notify(
            Topic::Conversations {
                workspace_id: workspace_id.clone(),
            },
            ChangeEvent::Changed {
                topic: Topic::Conversations { workspace_id },
            },
        );
        Ok(())
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, StoreError> {
        self.enter("messages_for_conversation").await?;
        let inner = self.inner.lock();
        let mut list: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        list.sort_by(Message::display_order);
        Ok(list)
    }

    async fn insert_message(&self, message: Message) -> Result<(), StoreError> {
        self.enter("insert_message").await?;
        let conversation_id = message.conversation_id.clone();
        self.inner.lock().messages.push(message);
        self.notify(
            Topic::Messages {
                conversation_id: conversation_id.clone(),
            },
            ChangeEvent::Changed {
                topic: Topic::Messages { conversation_id },
            },
        );
        Ok(())
    }

    async fn mark_messages_read(
        &self,
        conversation_id: &str,
        sender_role: SenderRole,
    ) -> Result<usize, StoreError> {
        self.enter("mark_messages_read").await?;
        let mut inner = self.inner.lock();
        let mut cleared = 0;
        for message in inner
            .messages
            .iter_mut()
            .filter(|m| {
                m.conversation_id == conversation_id && m.sender_role == sender_role && m.unread
            })
        {
            message.unread = false;
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn publish_typing(&self, signal: TypingSignal) -> Result<(), StoreError> {
        self.enter("publish_typing").await?;
        self.notify(
            Topic::Typing {
                conversation_id: signal.conversation_id.clone(),
            },
            ChangeEvent::Typing(signal),
        );
        Ok(())
    }

    async fn clients_for_workspace(&self, workspace_id: &str) -> Result<Vec<Client>, StoreError> {
        self.enter("clients_for_workspace").await?;
        let inner = self.inner.lock();
        Ok(inner
            .clients
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn recent_inbound_messages(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        self.enter("recent_inbound_messages").await?;
        let inner = self.inner.lock();
        let conversation_ids: Vec<&str> = inner
            .conversations
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .map(|c| c.id.as_str())
            .collect();
        let mut list: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| {
                m.sender_role == SenderRole::Client
                    && m.created_at >= since
                    && conversation_ids.contains(&m.conversation_id.as_str())
            })
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn recent_workouts(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<WorkoutRow>, StoreError> {
        self.enter("recent_workouts").await?;
        let inner = self.inner.lock();
        let client_ids: Vec<&str> = inner
            .clients
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .map(|c| c.id.as_str())
            .collect();
        let mut list: Vec<WorkoutRow> = inner
            .workouts
            .iter()
            .filter(|w| w.completed_at >= since && client_ids.contains(&w.client_id.as_str()))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn recent_habit_logs(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<HabitRow>, StoreError> {
        self.enter("recent_habit_logs").await?;
        let inner = self.inner.lock();
        let client_ids: Vec<&str> = inner
            .clients
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .map(|c| c.id.as_str())
            .collect();
        let mut list: Vec<HabitRow> = inner
            .habits
            .iter()
            .filter(|h| h.logged_at >= since && client_ids.contains(&h.client_id.as_str()))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn recent_checkins(
        &self,
        workspace_id: &str,
        since: u64,
        limit: usize,
    ) -> Result<Vec<CheckInRow>, StoreError> {
        self.enter("recent_checkins").await?;
        let inner = self.inner.lock();
        let client_ids: Vec<&str> = inner
            .clients
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .map(|c| c.id.as_str())
            .collect();
        let mut list: Vec<CheckInRow> = inner
            .checkins
            .iter()
            .filter(|c| c.submitted_at >= since && client_ids.contains(&c.client_id.as_str()))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn upcoming_calendar_events(
        &self,
        _workspace_id: &str,
        from: u64,
        until: u64,
        limit: usize,
    ) -> Result<Vec<CalendarRow>, StoreError> {
        self.enter("upcoming_calendar_events").await?;
        let inner = self.inner.lock();
        let mut list: Vec<CalendarRow> = inner
            .calendar
            .iter()
            .filter(|e| e.starts_at >= from && e.starts_at <= until)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        list.truncate(limit);
        Ok(list)
    }

    fn subscribe(&self, topic: Topic) -> mpsc::UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push((topic, tx));
        rx
    }
}
