//! Recency and relative-time helpers.
//!
//! The console shows activity as relative phrases ("2 hours ago") and
//! classifies users as active when they were seen within a fixed window.
//! `now` is always a parameter so derivations stay reproducible.

use chrono::{DateTime, Duration, Utc};
use chrono_humanize::HumanTime;

/// Days of inactivity after which a user no longer counts as active.
pub const ACTIVITY_WINDOW_DAYS: i64 = 7;

/// The recency window used by the stats projection.
#[must_use]
pub fn activity_window() -> Duration {
    Duration::days(ACTIVITY_WINDOW_DAYS)
}

/// Whether `ts` falls within `window` of `now`.
///
/// Timestamps in the future (clock skew between backend and client) count
/// as within the window.
#[must_use]
pub fn is_within(ts: DateTime<Utc>, window: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(ts) <= window
}

/// Relative phrase for a timestamp, e.g. "2 hours ago".
#[must_use]
pub fn relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    HumanTime::from(ts.signed_duration_since(now)).to_string()
}
