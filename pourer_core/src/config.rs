//! Runtime configuration types for the panel and the station.
//!
//! These are separate from the TOML-deserialized config in `pourer_config`;
//! see `conversions` for the bridge.

use std::time::Duration;

use crate::view::{AutomaticState, CalibrationState, ModeMemory};

/// Operator panel behavior.
#[derive(Debug, Clone)]
pub struct PanelCfg {
    /// Upper bound of the unit selector (lower bound is 1).
    pub max_units: u8,
    /// "End" is offered once the capture step exceeds this.
    pub min_steps_before_end: u8,
    /// Dwell on "Invalid: retry!" before returning to the capture screen.
    pub invalid_retry: Duration,
    /// Pause after each automatically dispensed unit.
    pub pour_spacing: Duration,
    pub default_units: u8,
    pub default_start_at_min: u32,
    pub default_every_min: u32,
    pub default_automatic_units: u8,
}

impl Default for PanelCfg {
    fn default() -> Self {
        Self {
            max_units: 9,
            min_steps_before_end: 5,
            invalid_retry: Duration::from_millis(1000),
            pour_spacing: Duration::from_millis(2000),
            default_units: 1,
            default_start_at_min: 60,
            default_every_min: 60,
            default_automatic_units: 2,
        }
    }
}

impl PanelCfg {
    /// Initial per-mode state.
    pub fn initial_memory(&self) -> ModeMemory {
        ModeMemory {
            calibration: CalibrationState {
                step: 1,
                show_end: false,
            },
            message: String::new(),
            units: self.default_units,
            start_at_min: self.default_start_at_min,
            every_min: self.default_every_min,
            automatic: AutomaticState {
                units: self.default_automatic_units,
                remaining_min: None,
                anchor: None,
            },
        }
    }
}

/// Station acceptance bounds and actuator pacing.
#[derive(Debug, Clone)]
pub struct StationCfg {
    /// Shortest plausible trigger-to-water latency (ms).
    pub min_x_ms: f64,
    /// Longest trigger-to-water latency (ms); also the flow wait limit.
    pub max_x_ms: f64,
    /// Longest plausible trigger-to-release time (ms).
    pub max_y_ms: f64,
    /// Flow sensor polling period while waiting for water.
    pub flow_poll: Duration,
}

impl Default for StationCfg {
    fn default() -> Self {
        Self {
            min_x_ms: 1.0,
            max_x_ms: 10_000.0,
            max_y_ms: 60_000.0,
            flow_poll: Duration::from_millis(10),
        }
    }
}
