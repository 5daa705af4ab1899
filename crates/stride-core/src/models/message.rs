use serde::{Deserialize, Serialize};

/// Who authored a message or typing signal. Closed set - the data model has
/// exactly two parties per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Coach,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_role: SenderRole,
    pub body: String,
    pub created_at: u64,
    /// Set on client-authored messages until the coach opens the thread.
    pub unread: bool,
}

impl Message {
    /// Display order within a thread: created_at ascending. Ties are broken
    /// by id so repeated sorts of the same set are stable across fetches.
    pub fn display_order(a: &Message, b: &Message) -> std::cmp::Ordering {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, created_at: u64) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            sender_id: "client-1".to_string(),
            sender_role: SenderRole::Client,
            body: "hi".to_string(),
            created_at,
            unread: true,
        }
    }

    #[test]
    fn display_order_is_ascending_with_id_tiebreak() {
        let mut list = vec![msg("c", 30), msg("a", 10), msg("b2", 20), msg("b1", 20)];
        list.sort_by(Message::display_order);
        let ids: Vec<&str> = list.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b1", "b2", "c"]);
    }
}
