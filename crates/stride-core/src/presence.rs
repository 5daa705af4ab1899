//! Typing presence, both directions.
//!
//! Presence is best-effort and never persisted: signals ride the typing
//! topic of the change feed and a failed publish is dropped, not retried.
//! The local side debounces keystrokes into a single true-state with an
//! idle timeout; the remote side displays the latest signal as-is.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::datastore::{ChangeEvent, DataStore, Topic};
use crate::models::{SenderRole, TypingSignal};

/// Publishes the local actor's typing state for one conversation.
///
/// Every keystroke (`input`) restarts the idle timer; the transition to
/// typing is published once, not per keystroke. The state flips back to
/// false on idle expiry, on `stop` (blur, successful send, teardown), and
/// the pending timer dies with the tracker.
pub struct TypingTracker {
    store: Arc<dyn DataStore>,
    conversation_id: String,
    actor_id: String,
    role: SenderRole,
    idle_timeout: Duration,
    is_typing: Arc<Mutex<bool>>,
    idle_task: Mutex<Option<JoinHandle<()>>>,
}

impl TypingTracker {
    pub fn new(
        store: Arc<dyn DataStore>,
        conversation_id: String,
        actor_id: String,
        role: SenderRole,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            conversation_id,
            actor_id,
            role,
            idle_timeout,
            is_typing: Arc::new(Mutex::new(false)),
            idle_task: Mutex::new(None),
        }
    }

    fn signal(&self, is_typing: bool) -> TypingSignal {
        TypingSignal {
            conversation_id: self.conversation_id.clone(),
            actor_id: self.actor_id.clone(),
            role: self.role,
            is_typing,
        }
    }

    fn publish(store: Arc<dyn DataStore>, signal: TypingSignal) {
        // Fire-and-forget: presence carries no guarantee worth retrying for.
        tokio::spawn(async move {
            if let Err(err) = store.publish_typing(signal).await {
                tracing::debug!(error = %err, "typing publish dropped");
            }
        });
    }

    /// Register a keystroke in the draft field.
    pub fn input(&self) {
        {
            let mut typing = self.is_typing.lock();
            if !*typing {
                *typing = true;
                Self::publish(self.store.clone(), self.signal(true));
            }
        }

        // (Re)arm the idle timer.
        let store = self.store.clone();
        let signal = self.signal(false);
        let is_typing = self.is_typing.clone();
        let idle_timeout = self.idle_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(idle_timeout).await;
            *is_typing.lock() = false;
            Self::publish(store, signal);
        });

        let mut slot = self.idle_task.lock();
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Explicitly leave the typing state: blur, successful send, or
    /// teardown of the conversation view. Cancels the idle timer and, if
    /// currently typing, publishes false so the counterpart never sees a
    /// stuck indicator.
    pub fn stop(&self) {
        if let Some(task) = self.idle_task.lock().take() {
            task.abort();
        }
        let mut typing = self.is_typing.lock();
        if *typing {
            *typing = false;
            Self::publish(self.store.clone(), self.signal(false));
        }
    }

    pub fn is_typing(&self) -> bool {
        *self.is_typing.lock()
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        // stop() is the teardown contract; this only reaps a live timer if
        // the caller forgot.
        if let Some(task) = self.idle_task.lock().take() {
            task.abort();
        }
    }
}

/// Observes the counterpart's typing state for one conversation and exposes
/// it as a display label set: `{label}` while the counterpart is typing,
/// empty otherwise. No receive-side debouncing - the latest signal wins.
pub struct RemoteTyping {
    rx: watch::Receiver<Vec<String>>,
    task: JoinHandle<()>,
}

impl RemoteTyping {
    pub fn spawn(
        store: Arc<dyn DataStore>,
        conversation_id: String,
        counterpart_role: SenderRole,
        counterpart_label: String,
    ) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let mut feed = store.subscribe(Topic::Typing {
            conversation_id: conversation_id.clone(),
        });
        let task = tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                let ChangeEvent::Typing(signal) = event else {
                    continue;
                };
                let labels = if signal.role == counterpart_role && signal.is_typing {
                    vec![counterpart_label.clone()]
                } else {
                    Vec::new()
                };
                if tx.send(labels).is_err() {
                    break;
                }
            }
        });
        Self { rx, task }
    }

    pub fn watch(&self) -> watch::Receiver<Vec<String>> {
        self.rx.clone()
    }

    /// Labels to render right now.
    pub fn labels(&self) -> Vec<String> {
        self.rx.borrow().clone()
    }
}

impl Drop for RemoteTyping {
    fn drop(&mut self) {
        self.task.abort();
    }
}
