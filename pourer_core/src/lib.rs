#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core pouring logic (hardware-agnostic).
//!
//! All hardware interactions go through `pourer_traits::Motor` and
//! `pourer_traits::FlowSensor`; the operator panel reaches them only through
//! the `MessageBus` answered by the `Station`.
//!
//! ## Architecture
//!
//! - **Curve**: two-stage least-squares fit of `y = a + b·e^(c·x)` (`curve`)
//! - **Panel**: button chords, eleven modes, calibration capture and the
//!   automatic dispensing schedule (`panel`)
//! - **Station**: bus owner holding the model, captured points, actuator and
//!   calibration store (`station`)
//! - **Runner**: channel-fed host loop with periodic ticks (`runner`)

pub mod builder;
pub mod bus;
pub mod config;
pub mod conversions;
pub mod curve;
pub mod error;
pub mod hw_error;
pub mod input;
pub mod minutes;
pub mod mocks;
pub mod panel;
pub mod runner;
pub mod station;
pub mod util;
pub mod view;

pub use builder::{Missing, PanelBuilder, Set};
pub use bus::{Command, MessageBus, Reply, Request};
pub use config::{PanelCfg, StationCfg};
pub use curve::{ExpCurve, FitError, FitStage, Param, SamplePoint};
pub use error::{BuildError, PanelError, Result, StationError};
pub use input::{Button, Chord, ChordTracker};
pub use panel::{Panel, Pause};
pub use runner::InputEvent;
pub use station::{CurveStore, FileCurveStore, MemoryCurveStore, Station};
pub use view::{Display, Mode, ModeMemory, View};
