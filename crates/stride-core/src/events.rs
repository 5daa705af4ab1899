use tokio::sync::mpsc;

/// Notifications pushed to the embedding layer so cached views know to
/// refetch. These carry no payload beyond the affected scope - the view
/// re-reads through the normal query path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// The conversation list for the active workspace changed
    /// (new conversation, or last-activity bump on send).
    ConversationListChanged,
    /// The message list for one conversation changed.
    ThreadChanged { conversation_id: String },
    /// A feed rebuild completed (successfully or as an empty pass).
    FeedRefreshed,
}

/// Best-effort fan-out of `CoreEvent`s. A missing or dropped receiver is
/// not an error; the polling fallback covers whatever the event would have
/// triggered.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<CoreEvent>>,
}

impl EventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event. Useful for tests and headless use.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: CoreEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
