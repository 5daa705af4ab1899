//! Conversation Resolver: maps a selected client onto the single
//! conversation for the `(workspace, client)` pair, creating it lazily on
//! first contact.

use std::sync::Arc;

use uuid::Uuid;

use crate::datastore::DataStore;
use crate::error::CoreError;
use crate::events::{CoreEvent, EventSink};
use crate::models::Conversation;

pub struct ConversationResolver {
    store: Arc<dyn DataStore>,
    events: EventSink,
}

impl ConversationResolver {
    pub fn new(store: Arc<dyn DataStore>, events: EventSink) -> Self {
        Self { store, events }
    }

    /// Find or create the conversation for `(workspace_id, client_id)`.
    ///
    /// Creation goes through the store's conflict-keyed upsert, so two
    /// resolvers racing on the same pair converge on the same row id - the
    /// loser's candidate id is simply discarded by the conflict resolution.
    /// On failure nothing is cached and the caller may re-invoke.
    pub async fn resolve(
        &self,
        workspace_id: &str,
        client_id: &str,
    ) -> Result<Conversation, CoreError> {
        if workspace_id.trim().is_empty() {
            return Err(CoreError::validation("workspace id must not be empty"));
        }
        if client_id.trim().is_empty() {
            return Err(CoreError::validation("client id must not be empty"));
        }

        if let Some(existing) = self.store.find_conversation(workspace_id, client_id).await? {
            return Ok(existing);
        }

        let candidate = Conversation {
            id: Uuid::new_v4().to_string(),
            workspace_id: workspace_id.to_string(),
            client_id: client_id.to_string(),
            last_message_at: 0,
        };
        let conversation = self.store.upsert_conversation(candidate).await?;
        tracing::debug!(
            conversation_id = %conversation.id,
            client_id,
            "resolved conversation"
        );

        // A row may have been created; cached list views must refetch.
        self.events.emit(CoreEvent::ConversationListChanged);
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemoryStore;
    use crate::error::StoreError;

    fn resolver(store: &Arc<MemoryStore>) -> ConversationResolver {
        ConversationResolver::new(store.clone(), EventSink::disconnected())
    }

    #[tokio::test]
    async fn concurrent_resolves_converge_on_one_id() {
        let store = Arc::new(MemoryStore::new());
        let a = resolver(&store);
        let b = resolver(&store);

        let (left, right) = tokio::join!(a.resolve("ws-1", "client-1"), b.resolve("ws-1", "client-1"));
        let (left, right) = (left.unwrap(), right.unwrap());
        assert_eq!(left.id, right.id);
        assert_eq!(
            store
                .conversations_for_workspace("ws-1")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn existing_conversation_is_returned_without_a_create() {
        let store = Arc::new(MemoryStore::new());
        store.seed_conversation(Conversation {
            id: "conv-7".to_string(),
            workspace_id: "ws-1".to_string(),
            client_id: "client-1".to_string(),
            last_message_at: 50,
        });

        let found = resolver(&store).resolve("ws-1", "client-1").await.unwrap();
        assert_eq!(found.id, "conv-7");
        assert_eq!(store.call_count("upsert_conversation"), 0);
    }

    #[tokio::test]
    async fn empty_ids_are_rejected_before_any_store_call() {
        let store = Arc::new(MemoryStore::new());
        let err = resolver(&store).resolve("ws-1", "  ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.call_count("find_conversation"), 0);
    }

    #[tokio::test]
    async fn upsert_failure_propagates_and_caller_can_retry() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(
            "upsert_conversation",
            StoreError::PermissionDenied("rls".into()),
        );

        let r = resolver(&store);
        let err = r.resolve("ws-1", "client-1").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::PermissionDenied(_))
        ));

        // Re-invoking after the fault succeeds and creates the row.
        let conversation = r.resolve("ws-1", "client-1").await.unwrap();
        assert_eq!(conversation.client_id, "client-1");
    }

    #[tokio::test]
    async fn creation_emits_a_conversation_list_invalidation() {
        let store = Arc::new(MemoryStore::new());
        let (sink, mut rx) = EventSink::new();
        let r = ConversationResolver::new(store, sink);
        r.resolve("ws-1", "client-1").await.unwrap();
        assert_eq!(rx.recv().await, Some(CoreEvent::ConversationListChanged));
    }
}
