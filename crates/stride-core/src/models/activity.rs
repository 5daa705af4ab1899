use serde::{Deserialize, Serialize};

use crate::constants::prefix;

/// Source category of one feed item. Five real domains plus the synthetic
/// inactivity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityDomain {
    Message,
    Workout,
    Habit,
    CheckIn,
    Calendar,
    Inactivity,
}

impl ActivityDomain {
    /// Id prefix used to namespace source-row ids per domain.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ActivityDomain::Message => prefix::MESSAGE,
            ActivityDomain::Workout => prefix::WORKOUT,
            ActivityDomain::Habit => prefix::HABIT,
            ActivityDomain::CheckIn => prefix::CHECKIN,
            ActivityDomain::Calendar => prefix::CALENDAR,
            ActivityDomain::Inactivity => prefix::INACTIVE,
        }
    }

    /// Feed item id for a source row: `"<prefix>:<row-id>"`. Distinct
    /// domains can never collide after merging because the prefixes differ.
    pub fn event_id(&self, row_id: &str) -> String {
        format!("{}:{}", self.id_prefix(), row_id)
    }
}

/// Where tapping a feed item takes the user. The embedding layer maps these
/// onto its own routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavTarget {
    Conversation { conversation_id: String },
    ClientProfile { client_id: String },
    Calendar { event_id: String },
}

/// One normalized feed item. Derived on every aggregation pass, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Namespaced id (`domain prefix + source row id`); the dedupe key.
    pub id: String,
    pub domain: ActivityDomain,
    pub title: String,
    pub description: String,
    pub occurred_at: u64,
    pub target: NavTarget,
}
