//! Raw rows for the non-message activity domains, as returned by the
//! backing store's reads. Each maps to a normalized `ActivityEvent` inside
//! the aggregator; nothing else in the core consumes them.

use serde::{Deserialize, Serialize};

/// A completed workout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRow {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub completed_at: u64,
}

/// One habit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRow {
    pub id: String,
    pub client_id: String,
    pub habit_name: String,
    pub logged_at: u64,
}

/// A submitted check-in form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRow {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub submitted_at: u64,
}

/// An upcoming calendar entry. Not necessarily client-scoped (workspace-wide
/// events carry no client id), which is why calendar rows never feed the
/// per-client activity cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRow {
    pub id: String,
    pub client_id: Option<String>,
    pub title: String,
    pub starts_at: u64,
}
