//! Utility functions shared across the assembly crates

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds in a day
pub const DAY: u64 = 86_400;
/// Seconds in a week
pub const WEEK: u64 = 7 * DAY;

/// Get the current timestamp in seconds
pub fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// Render a span of seconds as a short human string (`3w 2d 4h`)
pub fn format_span(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }
    let units = [("w", WEEK), ("d", DAY), ("h", 3_600), ("m", 60), ("s", 1)];
    let mut rest = secs;
    let mut parts = Vec::new();
    for (suffix, size) in units {
        if rest >= size {
            parts.push(format!("{}{}", rest / size, suffix));
            rest %= size;
        }
    }
    parts.join(" ")
}
