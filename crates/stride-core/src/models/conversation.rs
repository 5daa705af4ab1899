use serde::{Deserialize, Serialize};

/// A 1:1 channel between the workspace coach and one client.
///
/// At most one conversation exists per `(workspace_id, client_id)` pair;
/// the backing upsert's unique constraint on that pair is what enforces it
/// (see `ConversationResolver`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub workspace_id: String,
    pub client_id: String,
    /// Unix seconds of the most recent accepted outbound message.
    pub last_message_at: u64,
}
