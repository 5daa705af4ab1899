use std::time::Duration;

use crate::constants;

/// Tuning knobs for the sync core. `Default` mirrors production values;
/// tests shrink the durations to keep paused-clock runs fast.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Re-fetch interval for the open message thread.
    pub thread_poll: Duration,
    /// Rebuild interval for the activity feed.
    pub feed_refresh: Duration,
    /// Idle timeout before local typing flips back to false.
    pub typing_idle: Duration,
    /// "Recent" window for activity events; doubles as the inactivity cutoff.
    pub lookback: Duration,
    /// Window for upcoming calendar events.
    pub lookahead: Duration,
    /// Row cap applied to each domain fetch in one aggregation pass.
    pub per_domain_cap: usize,
    /// Item cap for the merged feed.
    pub max_feed_len: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            thread_poll: constants::THREAD_POLL_INTERVAL,
            feed_refresh: constants::FEED_REFRESH_INTERVAL,
            typing_idle: constants::TYPING_IDLE_TIMEOUT,
            lookback: constants::ACTIVITY_LOOKBACK,
            lookahead: constants::CALENDAR_LOOKAHEAD,
            per_domain_cap: constants::PER_DOMAIN_ROW_CAP,
            max_feed_len: constants::MAX_FEED_LEN,
        }
    }
}
