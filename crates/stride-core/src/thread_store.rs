//! Message Thread Store: the local, ordered view of one conversation's
//! messages, kept consistent across polling, push-triggered reloads, and
//! the coach's own sends.
//!
//! All reload triggers funnel into the same idempotent `load`. Every load
//! is tagged with a per-conversation generation taken *before* the fetch
//! suspends; a response is applied only if it still carries the latest
//! issued generation. That is last-initiated-wins: a slow stale response
//! can never clobber the result of a load that was started after it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::clock::unix_now;
use crate::datastore::{DataStore, Topic};
use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::feed::TopicSignal;
use crate::models::{Message, SenderRole};
use crate::poll::PollHandle;

#[derive(Default)]
struct ThreadState {
    messages: Vec<Message>,
    /// Generation handed to the most recently initiated load.
    issued_generation: u64,
    /// Generation of the load whose result is currently applied.
    applied_generation: u64,
    draft: String,
}

pub struct MessageThreadStore {
    store: Arc<dyn DataStore>,
    events: EventSink,
    threads: Mutex<HashMap<String, ThreadState>>,
}

/// Live push-refresh scope for one open conversation. Dropping it tears
/// down both the subscription and the reload task.
pub struct PushRefresh {
    _signal: TopicSignal,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for PushRefresh {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MessageThreadStore {
    pub fn new(store: Arc<dyn DataStore>, events: EventSink) -> Self {
        Self {
            store,
            events,
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Tag a new load. Must be called before the fetch suspends so that the
    /// issue order, not the response order, decides which result sticks.
    fn begin_load(&self, conversation_id: &str) -> u64 {
        let mut threads = self.threads.lock();
        let state = threads.entry(conversation_id.to_string()).or_default();
        state.issued_generation += 1;
        state.issued_generation
    }

    /// Apply a load result if `generation` is still the latest issued one.
    /// Returns whether the result was applied or dropped as superseded.
    fn apply_load(&self, conversation_id: &str, generation: u64, mut rows: Vec<Message>) -> bool {
        let mut threads = self.threads.lock();
        let state = threads.entry(conversation_id.to_string()).or_default();
        if generation != state.issued_generation {
            tracing::debug!(
                conversation_id,
                generation,
                latest = state.issued_generation,
                applied = state.applied_generation,
                "dropping superseded load result"
            );
            return false;
        }
        rows.sort_by(Message::display_order);
        state.messages = rows;
        state.applied_generation = generation;
        true
    }

    /// Fetch the thread and apply the result under the generation
    /// discipline. Returns the current local snapshot, which reflects this
    /// load unless a newer one was initiated while this one was in flight.
    pub async fn load(&self, conversation_id: &str) -> Result<Vec<Message>, CoreError> {
        let generation = self.begin_load(conversation_id);
        let rows = self.store.messages_for_conversation(conversation_id).await?;
        self.apply_load(conversation_id, generation, rows);
        Ok(self.messages(conversation_id))
    }

    /// Current local snapshot, created_at ascending. Empty if never loaded.
    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.threads
            .lock()
            .get(conversation_id)
            .map(|state| state.messages.clone())
            .unwrap_or_default()
    }

    /// Unread client-authored messages in the local snapshot.
    pub fn unread_count(&self, conversation_id: &str) -> usize {
        self.threads
            .lock()
            .get(conversation_id)
            .map(|state| {
                state
                    .messages
                    .iter()
                    .filter(|m| m.unread && m.sender_role == SenderRole::Client)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Send a coach message.
    ///
    /// Validates the trimmed body before any network call. On success the
    /// draft is cleared, the conversation's last-activity timestamp is
    /// bumped, and a reload of both the thread and the conversation list is
    /// triggered. On failure the draft survives so no input is lost; the
    /// error is surfaced and not retried here. Callers also own a
    /// `TypingTracker` for the conversation and stop it on success.
    pub async fn send(
        &self,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
    ) -> Result<Message, CoreError> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(CoreError::validation("message body must not be empty"));
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_role: SenderRole::Coach,
            body: trimmed.to_string(),
            created_at: unix_now(),
            unread: false,
        };
        self.store.insert_message(message.clone()).await?;

        // Accepted: the draft is spent and the conversation surfaces to the
        // top of the list.
        self.set_draft(conversation_id, "");
        if let Err(err) = self
            .store
            .touch_conversation(conversation_id, message.created_at)
            .await
        {
            tracing::warn!(conversation_id, error = %err, "last-activity bump failed");
        }

        self.events.emit(CoreEvent::ThreadChanged {
            conversation_id: conversation_id.to_string(),
        });
        self.events.emit(CoreEvent::ConversationListChanged);

        // The message was accepted; a failed reload only delays the echo
        // until the next poll tick.
        if let Err(err) = self.load(conversation_id).await {
            tracing::warn!(conversation_id, error = %err, "post-send reload failed");
        }
        Ok(message)
    }

    /// Bulk-clear unread state for client-authored messages in the open
    /// thread. No-op while the local thread is empty; idempotent once it
    /// isn't.
    pub async fn mark_read(&self, conversation_id: &str) -> Result<usize, CoreError> {
        if self.messages(conversation_id).is_empty() {
            return Ok(0);
        }

        let cleared = self
            .store
            .mark_messages_read(conversation_id, SenderRole::Client)
            .await?;

        let mut threads = self.threads.lock();
        if let Some(state) = threads.get_mut(conversation_id) {
            for message in &mut state.messages {
                if message.sender_role == SenderRole::Client {
                    message.unread = false;
                }
            }
        }
        Ok(cleared)
    }

    // ===== Draft =====

    pub fn draft(&self, conversation_id: &str) -> String {
        self.threads
            .lock()
            .get(conversation_id)
            .map(|state| state.draft.clone())
            .unwrap_or_default()
    }

    pub fn set_draft(&self, conversation_id: &str, draft: &str) {
        let mut threads = self.threads.lock();
        let state = threads.entry(conversation_id.to_string()).or_default();
        state.draft = draft.to_string();
    }

    /// Reload on every push notification for the conversation. Push and
    /// polling both funnel into the same `load`, so whichever fires first
    /// wins and the other becomes a cheap no-op refetch.
    pub fn start_push_refresh(self: &Arc<Self>, conversation_id: String) -> PushRefresh {
        let signal = TopicSignal::spawn(
            self.store.clone(),
            Topic::Messages {
                conversation_id: conversation_id.clone(),
            },
        );
        let mut rx = signal.watch();
        let store = Arc::clone(self);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if let Err(err) = store.load(&conversation_id).await {
                    tracing::warn!(conversation_id, error = %err, "push-triggered reload failed");
                }
            }
        });
        PushRefresh {
            _signal: signal,
            task,
        }
    }

    /// Keep the thread fresh while it is the active view. The handle is
    /// scoped to the open conversation; dropping it on navigation stops the
    /// refresh.
    pub fn start_polling(
        self: &Arc<Self>,
        conversation_id: String,
        period: Duration,
    ) -> PollHandle {
        let store = Arc::clone(self);
        PollHandle::spawn("thread", period, move || {
            let store = Arc::clone(&store);
            let conversation_id = conversation_id.clone();
            async move {
                store.load(&conversation_id).await?;
                Ok(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemoryStore;
    use crate::error::StoreError;

    fn message(id: &str, conversation_id: &str, role: SenderRole, created_at: u64) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: match role {
                SenderRole::Coach => "coach-1".to_string(),
                SenderRole::Client => "client-1".to_string(),
            },
            sender_role: role,
            body: format!("body of {id}"),
            created_at,
            unread: role == SenderRole::Client,
        }
    }

    fn thread_store(store: &Arc<MemoryStore>) -> MessageThreadStore {
        MessageThreadStore::new(store.clone(), EventSink::disconnected())
    }

    #[tokio::test]
    async fn load_sorts_ascending_regardless_of_fetch_order() {
        let store = Arc::new(MemoryStore::new());
        store.seed_message(message("m3", "conv-1", SenderRole::Client, 300));
        store.seed_message(message("m1", "conv-1", SenderRole::Coach, 100));
        store.seed_message(message("m2", "conv-1", SenderRole::Client, 200));

        let threads = thread_store(&store);
        let list = threads.load("conv-1").await.unwrap();
        let ids: Vec<&str> = list.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn late_result_from_a_superseded_load_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let threads = thread_store(&store);

        // Load A initiated first, load B initiated second.
        let gen_a = threads.begin_load("conv-1");
        let gen_b = threads.begin_load("conv-1");

        // B's response arrives first and is applied.
        let applied_b = threads.apply_load(
            "conv-1",
            gen_b,
            vec![message("fresh", "conv-1", SenderRole::Client, 200)],
        );
        assert!(applied_b);

        // A's response arrives late and must not clobber B's.
        let applied_a = threads.apply_load(
            "conv-1",
            gen_a,
            vec![message("stale", "conv-1", SenderRole::Client, 100)],
        );
        assert!(!applied_a);

        let ids: Vec<String> = threads
            .messages("conv-1")
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["fresh".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_first_load_cannot_clobber_a_fresher_one() {
        let store = Arc::new(MemoryStore::new());
        store.seed_message(message("m1", "conv-1", SenderRole::Client, 100));
        // The first fetch stalls in flight; everything after it completes
        // before its response lands.
        store.delay_next("messages_for_conversation", Duration::from_millis(300));

        let threads = Arc::new(thread_store(&store));
        let slow = {
            let threads = Arc::clone(&threads);
            tokio::spawn(async move { threads.load("conv-1").await })
        };
        // Let the slow load tag its generation and park on the network.
        tokio::task::yield_now().await;

        let fresh = threads.load("conv-1").await.unwrap();
        assert_eq!(fresh.len(), 1);

        // Lands while the slow load is still in flight: its late response
        // will carry this row under a superseded generation.
        store.seed_message(message("m2", "conv-1", SenderRole::Client, 200));

        slow.await.unwrap().unwrap();
        let ids: Vec<String> = threads
            .messages("conv-1")
            .into_iter()
            .map(|m| m.id)
            .collect();
        // The superseded response was dropped; m2 waits for the next load.
        assert_eq!(ids, vec!["m1".to_string()]);

        threads.load("conv-1").await.unwrap();
        assert_eq!(threads.messages("conv-1").len(), 2);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_noop_on_empty_thread() {
        let store = Arc::new(MemoryStore::new());
        let threads = thread_store(&store);

        // Empty local thread: no-op, no store call.
        assert_eq!(threads.mark_read("conv-1").await.unwrap(), 0);
        assert_eq!(store.call_count("mark_messages_read"), 0);

        store.seed_message(message("m1", "conv-1", SenderRole::Client, 100));
        store.seed_message(message("m2", "conv-1", SenderRole::Client, 200));
        threads.load("conv-1").await.unwrap();
        assert_eq!(threads.unread_count("conv-1"), 2);

        assert_eq!(threads.mark_read("conv-1").await.unwrap(), 2);
        assert_eq!(threads.unread_count("conv-1"), 0);

        // Second call clears nothing further.
        assert_eq!(threads.mark_read("conv-1").await.unwrap(), 0);
        assert_eq!(threads.unread_count("conv-1"), 0);
    }

    #[tokio::test]
    async fn send_rejects_empty_body_before_any_store_call() {
        let store = Arc::new(MemoryStore::new());
        let threads = thread_store(&store);
        let err = threads.send("conv-1", "coach-1", "   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.call_count("insert_message"), 0);
    }

    #[tokio::test]
    async fn failed_send_preserves_the_draft() {
        let store = Arc::new(MemoryStore::new());
        let threads = thread_store(&store);
        threads.set_draft("conv-1", "almost done...");
        store.fail_next("insert_message", StoreError::Transient("offline".into()));

        let err = threads
            .send("conv-1", "coach-1", "almost done...")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::Transient(_))));
        assert_eq!(threads.draft("conv-1"), "almost done...");
    }

    #[tokio::test]
    async fn successful_send_clears_draft_and_bumps_last_activity() {
        let store = Arc::new(MemoryStore::new());
        store.seed_conversation(crate::models::Conversation {
            id: "conv-1".to_string(),
            workspace_id: "ws-1".to_string(),
            client_id: "client-1".to_string(),
            last_message_at: 0,
        });
        let threads = thread_store(&store);
        threads.set_draft("conv-1", "  hello there  ");

        let sent = threads
            .send("conv-1", "coach-1", "  hello there  ")
            .await
            .unwrap();
        assert_eq!(sent.body, "hello there");
        assert_eq!(threads.draft("conv-1"), "");

        let conversations = store.conversations_for_workspace("ws-1").await.unwrap();
        assert_eq!(conversations[0].last_message_at, sent.created_at);

        // The local snapshot already contains the accepted message.
        assert!(threads
            .messages("conv-1")
            .iter()
            .any(|m| m.id == sent.id));
    }

    #[tokio::test(start_paused = true)]
    async fn send_flow_resets_typing_to_false() {
        use crate::datastore::ChangeEvent;
        use crate::presence::TypingTracker;

        let store = Arc::new(MemoryStore::new());
        let mut feed = store.subscribe(Topic::Typing {
            conversation_id: "conv-1".to_string(),
        });
        let threads = thread_store(&store);
        let tracker = TypingTracker::new(
            store.clone(),
            "conv-1".to_string(),
            "coach-1".to_string(),
            SenderRole::Coach,
            Duration::from_millis(1500),
        );

        tracker.input();
        match feed.recv().await {
            Some(ChangeEvent::Typing(signal)) => assert!(signal.is_typing),
            other => panic!("expected typing signal, got {other:?}"),
        }

        // Accepted send: the view stops its tracker along with clearing
        // the draft, so the counterpart sees typing drop immediately.
        threads.send("conv-1", "coach-1", "on my way").await.unwrap();
        tracker.stop();

        match feed.recv().await {
            Some(ChangeEvent::Typing(signal)) => assert!(!signal.is_typing),
            other => panic!("expected typing signal, got {other:?}"),
        }
        assert!(!tracker.is_typing());
    }

    #[tokio::test]
    async fn push_notification_triggers_a_reload() {
        let store = Arc::new(MemoryStore::new());
        let threads = Arc::new(thread_store(&store));
        threads.load("conv-1").await.unwrap();
        let _push = threads.start_push_refresh("conv-1".to_string());

        // Counterpart message lands on the remote store; its change
        // notification alone must refresh the local snapshot.
        store
            .insert_message(message("m1", "conv-1", SenderRole::Client, 100))
            .await
            .unwrap();

        let mut seen = false;
        for _ in 0..50 {
            tokio::task::yield_now().await;
            if !threads.messages("conv-1").is_empty() {
                seen = true;
                break;
            }
        }
        assert!(seen, "push-triggered reload never applied");
    }

    #[tokio::test(start_paused = true)]
    async fn polling_picks_up_a_message_sent_behind_our_back() {
        let store = Arc::new(MemoryStore::new());
        store.seed_message(message("m1", "conv-1", SenderRole::Client, 100));

        let threads = Arc::new(thread_store(&store));
        threads.load("conv-1").await.unwrap();
        let _poller = threads.start_polling("conv-1".to_string(), Duration::from_secs(4));

        store.seed_message(message("m2", "conv-1", SenderRole::Client, 200));
        tokio::time::sleep(Duration::from_millis(4100)).await;

        let ids: Vec<String> = threads
            .messages("conv-1")
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1".to_string(), "m2".to_string()]);
    }
}
