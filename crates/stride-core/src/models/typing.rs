use serde::{Deserialize, Serialize};

use super::message::SenderRole;

/// Ephemeral typing presence, keyed by `(conversation_id, actor_id)`.
///
/// Latest-wins: every write supersedes the previous value and no history is
/// kept. The signal travels over the change feed's typing topic rather than
/// a durable table, so a dropped signal is simply absent until the next
/// keystroke or the sender's idle timeout publishes a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSignal {
    pub conversation_id: String,
    pub actor_id: String,
    pub role: SenderRole,
    pub is_typing: bool,
}
