//! Minute stepping for the schedule editors.
//!
//! The step size grows with the value so a few presses cover both short
//! delays and multi-day intervals:
//!
//! | value      | step |
//! |------------|------|
//! | ≥ 1440     | 1440 |
//! | ≥ 60       | 30   |
//! | ≥ 30       | 10   |
//! | ≥ 15       | 5    |
//! | otherwise  | 1    |
//!
//! `decrease` undoes `increase` exactly, so "+" then "−" always returns to
//! the starting value.

use crate::util::MINUTES_PER_DAY;

fn step_for(minutes: u32) -> u32 {
    match minutes {
        m if m >= MINUTES_PER_DAY => MINUTES_PER_DAY,
        m if m >= 60 => 30,
        m if m >= 30 => 10,
        m if m >= 15 => 5,
        _ => 1,
    }
}

const STEPS: [u32; 5] = [1, 5, 10, 30, MINUTES_PER_DAY];

/// Next larger value. No ceiling.
pub fn increase(minutes: u32) -> u32 {
    minutes.saturating_add(step_for(minutes)).max(1)
}

/// Next smaller value, never below 1.
///
/// Returns the `p` with `increase(p) == minutes` when one exists, otherwise
/// subtracts the step of the current value.
pub fn decrease(minutes: u32) -> u32 {
    STEPS
        .iter()
        .filter_map(|&s| minutes.checked_sub(s))
        .find(|&p| p >= 1 && p.saturating_add(step_for(p)) == minutes)
        .unwrap_or_else(|| minutes.saturating_sub(step_for(minutes)).max(1))
}

/// Split minutes into whole days, hours and minutes.
pub const fn decompose(minutes: u32) -> (u32, u32, u32) {
    let days = minutes / MINUTES_PER_DAY;
    let rest = minutes % MINUTES_PER_DAY;
    (days, rest / 60, rest % 60)
}
