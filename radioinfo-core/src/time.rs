//! Local wall-clock helpers.
//!
//! Programs carry naive local timestamps (no zone), so every comparison in
//! the crate goes through these functions to stay on the same clock.

use chrono::{DateTime, Local, NaiveDateTime};

/// Current local wall-clock time without a zone.
#[must_use]
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Convert Unix epoch milliseconds to naive local time.
///
/// Returns `None` when the value is outside chrono's representable range.
#[must_use]
pub fn naive_local_from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&Local).naive_local())
}
