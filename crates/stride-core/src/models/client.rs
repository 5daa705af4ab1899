use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Currently coached. Only active clients participate in inactivity
    /// alerting.
    Active,
    Paused,
    Archived,
}

/// Roster entry for one coached client inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub workspace_id: String,
    pub display_name: String,
    pub status: ClientStatus,
}
