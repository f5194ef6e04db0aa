//! Timestamp precision shared by the store and the read cursors.
//!
//! Timestamps are kept at microsecond precision everywhere so a value
//! survives a round trip through storage unchanged and comparisons between
//! cursors and message timestamps are exact.

use chrono::{DateTime, Duration, DurationRound, Utc};

/// Smallest step between two message timestamps in one conversation.
pub const TICK: Duration = Duration::microseconds(1);

/// Truncate a timestamp to microsecond precision.
pub fn truncate(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.duration_trunc(TICK).unwrap_or(dt)
}

/// Current time truncated to microsecond precision.
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}
