#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration file formats for the pouring station.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Calibration points can be imported from a strict `x_ms,y_ms` CSV.
//! - Fitted curve parameters are persisted as a small TOML document written
//!   atomically, so a reboot resumes with the last saved calibration.
pub mod atomic;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Calibration CSV schema.
///
/// Expected headers:
/// x_ms,y_ms
///
/// Example:
/// x_ms,y_ms
/// 420,2900
/// 610,3350
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CalibrationPointRow {
    /// Trigger-to-water latency in milliseconds.
    pub x_ms: f64,
    /// Trigger-to-release time in milliseconds.
    pub y_ms: f64,
}

/// Operator panel behavior.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PanelCfg {
    /// Upper bound of the unit selector.
    pub max_units: u8,
    /// Captured points required before "End" is offered.
    pub min_steps_before_end: u8,
    /// How long "Invalid: retry!" stays on screen.
    pub invalid_retry_ms: u64,
    /// Pause after each automatically dispensed unit.
    pub pour_spacing_ms: u64,
    /// Host polling period for held buttons and the scheduler.
    pub tick_ms: u64,
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
            invalid_retry_ms: 1000,
            pour_spacing_ms: 2000,
            tick_ms: 50,
            default_units: 1,
            default_start_at_min: 60,
            default_every_min: 60,
            default_automatic_units: 2,
        }
    }
}

/// Calibration acceptance bounds and persistence.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Where fitted parameters are saved (TOML). None keeps them in memory only.
    pub file: Option<String>,
    /// Shortest plausible trigger-to-water latency.
    pub min_x_ms: f64,
    /// Longest trigger-to-water latency; also the flow wait limit when pouring.
    pub max_x_ms: f64,
    /// Longest plausible trigger-to-release time.
    pub max_y_ms: f64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            file: None,
            min_x_ms: 1.0,
            max_x_ms: 10_000.0,
            max_y_ms: 60_000.0,
        }
    }
}

/// GPIO assignment for the hardware backend (BCM numbering).
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub button_1: u8,
    pub button_2: u8,
    pub button_3: u8,
    pub flow_sensor: u8,
    pub motor_step: u8,
    pub motor_dir: u8,
    pub motor_en: Option<u8>,
}

/// Actuator timing.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MotorCfg {
    /// Step pulses for a full lower or raise stroke.
    pub stroke_steps: u32,
    /// Step rate while moving.
    pub steps_per_sec: u32,
    /// Flow sensor polling period while waiting for water.
    pub flow_poll_ms: u64,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            stroke_steps: 400,
            steps_per_sec: 800,
            flow_poll_ms: 10,
        }
    }
}

/// Simulated rig used when no hardware backend is compiled in.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Delay between lowering the straw and water reaching the sensor.
    pub water_latency_ms: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            water_latency_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub panel: PanelCfg,
    pub calibration: CalibrationCfg,
    /// Required only by the GPIO backend.
    pub pins: Option<Pins>,
    pub motor: MotorCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

/// Fitted parameters of `y = a + b·e^(c·x)` as stored on disk.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PersistedCurve {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

#[derive(Debug, Deserialize, Serialize)]
struct CurveDocument {
    curve: PersistedCurve,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

/// Load calibration points from a CSV with exact `x_ms,y_ms` headers.
pub fn load_points_csv(path: &Path) -> eyre::Result<Vec<CalibrationPointRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["x_ms", "y_ms"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'x_ms,y_ms', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationPointRow>().enumerate() {
        match rec {
            Ok(row) if row.x_ms.is_finite() && row.y_ms.is_finite() => rows.push(row),
            Ok(_) => eyre::bail!("non-finite value in CSV row {}", idx + 2),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    if rows.len() < 2 {
        eyre::bail!("calibration requires at least two rows, got {}", rows.len());
    }
    Ok(rows)
}

/// Load persisted curve parameters. A missing file means "never calibrated".
pub fn load_curve(path: &Path) -> eyre::Result<Option<PersistedCurve>> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => eyre::bail!("read calibration {:?}: {}", path, e),
    };
    let doc: CurveDocument =
        toml::from_str(&text).map_err(|e| eyre::eyre!("parse calibration {:?}: {}", path, e))?;
    let c = doc.curve;
    if !(c.a.is_finite() && c.b.is_finite() && c.c.is_finite()) {
        eyre::bail!("calibration {:?} holds non-finite parameters", path);
    }
    Ok(Some(c))
}

/// Persist curve parameters atomically.
pub fn save_curve(path: &Path, curve: &PersistedCurve) -> eyre::Result<()> {
    let doc = CurveDocument { curve: *curve };
    let text = toml::to_string(&doc).map_err(|e| eyre::eyre!("encode calibration: {}", e))?;
    atomic::write_atomic(path, text.as_bytes())
        .map_err(|e| eyre::eyre!("write calibration {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Panel
        if self.panel.max_units == 0 {
            eyre::bail!("panel.max_units must be >= 1");
        }
        if self.panel.default_units == 0 || self.panel.default_units > self.panel.max_units {
            eyre::bail!("panel.default_units must be in [1, panel.max_units]");
        }
        if self.panel.default_automatic_units == 0 {
            eyre::bail!("panel.default_automatic_units must be >= 1");
        }
        if self.panel.default_start_at_min == 0 {
            eyre::bail!("panel.default_start_at_min must be >= 1");
        }
        if self.panel.default_every_min == 0 {
            eyre::bail!("panel.default_every_min must be >= 1");
        }
        if self.panel.min_steps_before_end < 3 {
            eyre::bail!("panel.min_steps_before_end must be >= 3 (a fit needs three distinct points)");
        }
        if self.panel.tick_ms == 0 {
            eyre::bail!("panel.tick_ms must be >= 1");
        }
        if self.panel.invalid_retry_ms > 60_000 {
            eyre::bail!("panel.invalid_retry_ms is unreasonably large (>60s)");
        }
        if self.panel.pour_spacing_ms > 10 * 60 * 1000 {
            eyre::bail!("panel.pour_spacing_ms is unreasonably large (>10min)");
        }

        // Calibration bounds
        let cal = &self.calibration;
        if !(cal.min_x_ms.is_finite() && cal.max_x_ms.is_finite() && cal.max_y_ms.is_finite()) {
            eyre::bail!("calibration bounds must be finite");
        }
        if cal.min_x_ms < 0.0 {
            eyre::bail!("calibration.min_x_ms must be >= 0");
        }
        if cal.max_x_ms <= cal.min_x_ms {
            eyre::bail!("calibration.max_x_ms must be > calibration.min_x_ms");
        }
        if cal.max_y_ms <= cal.max_x_ms {
            eyre::bail!("calibration.max_y_ms must be > calibration.max_x_ms");
        }

        // Motor
        if self.motor.steps_per_sec == 0 {
            eyre::bail!("motor.steps_per_sec must be > 0");
        }
        if self.motor.flow_poll_ms == 0 {
            eyre::bail!("motor.flow_poll_ms must be >= 1");
        }

        // Pins: buttons must be distinct from each other and from the sensor
        if let Some(p) = &self.pins {
            let mut used = vec![
                p.button_1,
                p.button_2,
                p.button_3,
                p.flow_sensor,
                p.motor_step,
                p.motor_dir,
            ];
            used.extend(p.motor_en);
            let n = used.len();
            used.sort_unstable();
            used.dedup();
            if used.len() != n {
                eyre::bail!("pins must be distinct");
            }
        }

        Ok(())
    }
}
