#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! 16x2 character LCD rendering for the operator panel.
//!
//! `frame_for` turns a `View` into positioned text writes; `LcdRenderer`
//! replays them on any `TextSurface` and implements the panel's `Display`.

pub mod frame;
pub mod lcd;

pub use frame::{COLS, Frame, ROWS, TextWrite, frame_for};
pub use lcd::{LcdRenderer, MemorySurface, TextSurface};
