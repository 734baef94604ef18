//! `From` implementations bridging `pourer_config` types to `pourer_core` types.

use std::time::Duration;

use crate::config::{PanelCfg, StationCfg};
use crate::curve::{ExpCurve, SamplePoint};

// ── PanelCfg ─────────────────────────────────────────────────────────────────

impl From<&pourer_config::PanelCfg> for PanelCfg {
    fn from(c: &pourer_config::PanelCfg) -> Self {
        Self {
            max_units: c.max_units,
            min_steps_before_end: c.min_steps_before_end,
            invalid_retry: Duration::from_millis(c.invalid_retry_ms),
            pour_spacing: Duration::from_millis(c.pour_spacing_ms),
            default_units: c.default_units,
            default_start_at_min: c.default_start_at_min,
            default_every_min: c.default_every_min,
            default_automatic_units: c.default_automatic_units,
        }
    }
}

// ── StationCfg ───────────────────────────────────────────────────────────────

impl From<&pourer_config::Config> for StationCfg {
    fn from(c: &pourer_config::Config) -> Self {
        Self {
            min_x_ms: c.calibration.min_x_ms,
            max_x_ms: c.calibration.max_x_ms,
            max_y_ms: c.calibration.max_y_ms,
            flow_poll: Duration::from_millis(c.motor.flow_poll_ms.max(1)),
        }
    }
}

// ── Calibration data ─────────────────────────────────────────────────────────

impl From<&pourer_config::CalibrationPointRow> for SamplePoint {
    fn from(r: &pourer_config::CalibrationPointRow) -> Self {
        Self::new(r.x_ms, r.y_ms)
    }
}

impl From<pourer_config::PersistedCurve> for ExpCurve {
    fn from(p: pourer_config::PersistedCurve) -> Self {
        Self::with_params(p.a, p.b, p.c)
    }
}

impl From<&ExpCurve> for pourer_config::PersistedCurve {
    fn from(c: &ExpCurve) -> Self {
        let (a, b, c) = c.params();
        Self { a, b, c }
    }
}
