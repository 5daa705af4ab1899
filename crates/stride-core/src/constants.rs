//! Application-wide constants
//!
//! Centralized location for the timing and sizing values that are used
//! across multiple modules. All of them can be overridden per instance
//! through `CoreConfig`.

use std::time::Duration;

/// How often an open message thread is re-fetched while it is the active view.
pub const THREAD_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// How often the activity feed is rebuilt from scratch.
pub const FEED_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Idle time after the last keystroke before the local typing signal
/// flips back to false.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Lookback window for "recent" activity. Also the inactivity cutoff:
/// an active client with no qualifying event inside this window gets a
/// synthesized inactivity alert anchored at the window edge.
pub const ACTIVITY_LOOKBACK: Duration = Duration::from_secs(48 * 60 * 60);

/// Lookahead window for upcoming calendar events.
pub const CALENDAR_LOOKAHEAD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Per-domain row cap for one aggregation pass.
pub const PER_DOMAIN_ROW_CAP: usize = 25;

/// Maximum number of items in the merged activity feed.
pub const MAX_FEED_LEN: usize = 30;

// Activity event id prefixes - namespaced by source domain so ids from
// distinct domains can never collide after merging.
pub mod prefix {
    /// Inbound client message
    pub const MESSAGE: &str = "msg";
    /// Completed workout
    pub const WORKOUT: &str = "workout";
    /// Habit log entry
    pub const HABIT: &str = "habit";
    /// Submitted check-in
    pub const CHECKIN: &str = "checkin";
    /// Upcoming calendar event
    pub const CALENDAR: &str = "calendar";
    /// Synthesized inactivity alert (keyed by client id, not a source row)
    pub const INACTIVE: &str = "inactive";
}
