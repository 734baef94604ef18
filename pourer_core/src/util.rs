//! Common time helpers for pourer_core.

/// Number of milliseconds in one minute.
pub const MILLIS_PER_MINUTE: u64 = 60_000;
/// Number of minutes in one day.
pub const MINUTES_PER_DAY: u32 = 1_440;

/// Whole minutes contained in `ms`, saturating into `i64`.
#[inline]
pub fn whole_minutes(ms: u64) -> i64 {
    i64::try_from(ms / MILLIS_PER_MINUTE).unwrap_or(i64::MAX)
}
