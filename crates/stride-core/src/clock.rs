use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock unix seconds. Timestamps throughout the crate are plain
/// `u64` seconds; components that need a controllable "now" (the
/// aggregator) take it as a parameter instead of calling this.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
