//! Event Source Adapter: one change-feed subscription normalized into a
//! payload-agnostic "topic changed" signal.
//!
//! Consumers watch a monotonic counter; a bump means "refetch". Bursts of
//! notifications coalesce naturally because `watch` only keeps the latest
//! value - subscribers that were mid-fetch see a single combined bump.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::datastore::{ChangeEvent, DataStore, Topic};

/// A live subscription to one topic, normalized to a change counter.
/// Dropping the signal aborts the consuming task.
pub struct TopicSignal {
    rx: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl TopicSignal {
    pub fn spawn(store: Arc<dyn DataStore>, topic: Topic) -> Self {
        let (tx, rx) = watch::channel(0u64);
        let mut feed = store.subscribe(topic.clone());
        let task = tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                match event {
                    ChangeEvent::Changed { .. } | ChangeEvent::Typing(_) => {
                        tx.send_modify(|generation| *generation += 1);
                    }
                }
                if tx.is_closed() {
                    break;
                }
            }
            tracing::debug!(?topic, "change feed ended");
        });
        Self { rx, task }
    }

    /// Watch side for the owning view. `changed().await` resolves on the
    /// next bump after the last `borrow_and_update()`.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.rx.clone()
    }
}

impl Drop for TopicSignal {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemoryStore;
    use crate::models::{Message, SenderRole};

    fn message(id: &str, conversation_id: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: "client-1".to_string(),
            sender_role: SenderRole::Client,
            body: "hello".to_string(),
            created_at: 100,
            unread: true,
        }
    }

    #[tokio::test]
    async fn insert_bumps_the_signal_for_the_matching_topic_only() {
        let store = Arc::new(MemoryStore::new());
        let signal = TopicSignal::spawn(
            store.clone(),
            Topic::Messages {
                conversation_id: "conv-1".to_string(),
            },
        );
        let mut rx = signal.watch();
        rx.borrow_and_update();

        store.insert_message(message("m1", "conv-1")).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        // A different conversation must not bump this signal.
        store.insert_message(message("m2", "conv-2")).await.unwrap();
        tokio::task::yield_now().await;
        assert!(!rx.has_changed().unwrap());
    }
}
