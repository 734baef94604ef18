//! The station answers the panel's bus traffic.
//!
//! It owns the fitted curve, the points captured during calibration, the
//! straw actuator, the flow sensor and the calibration store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pourer_traits::{Clock, FlowSensor, Motor};

use crate::bus::{Command, MessageBus, Reply, Request};
use crate::config::StationCfg;
use crate::curve::{ExpCurve, SamplePoint};
use crate::error::StationError;
use crate::hw_error::map_hw_error;

type BusError = Box<dyn std::error::Error + Send + Sync>;

/// Where fitted parameters survive a restart.
pub trait CurveStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&mut self) -> eyre::Result<Option<ExpCurve>>;
    fn save(&mut self, curve: &ExpCurve) -> eyre::Result<()>;
}

/// TOML file store (`[curve] a, b, c`), written atomically.
#[derive(Debug, Clone)]
pub struct FileCurveStore {
    path: PathBuf,
}

impl FileCurveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CurveStore for FileCurveStore {
    fn load(&mut self) -> eyre::Result<Option<ExpCurve>> {
        Ok(pourer_config::load_curve(&self.path)?.map(ExpCurve::from))
    }

    fn save(&mut self, curve: &ExpCurve) -> eyre::Result<()> {
        pourer_config::save_curve(&self.path, &curve.into())
    }
}

/// Volatile store; what a board without persistent storage has.
#[derive(Debug, Clone, Default)]
pub struct MemoryCurveStore {
    saved: Option<ExpCurve>,
}

impl MemoryCurveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(curve: ExpCurve) -> Self {
        Self { saved: Some(curve) }
    }

    pub const fn saved(&self) -> Option<&ExpCurve> {
        self.saved.as_ref()
    }
}

impl CurveStore for MemoryCurveStore {
    fn load(&mut self) -> eyre::Result<Option<ExpCurve>> {
        Ok(self.saved)
    }

    fn save(&mut self, curve: &ExpCurve) -> eyre::Result<()> {
        self.saved = Some(*curve);
        Ok(())
    }
}

pub struct Station<M, F> {
    motor: M,
    flow: F,
    curve: ExpCurve,
    points: Vec<SamplePoint>,
    store: Box<dyn CurveStore>,
    cfg: StationCfg,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<M: Motor, F: FlowSensor> Station<M, F> {
    pub fn new(motor: M, flow: F, cfg: StationCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            motor,
            flow,
            curve: ExpCurve::new(),
            points: Vec::new(),
            store: Box::new(MemoryCurveStore::new()),
            cfg,
            clock,
        }
    }

    pub fn with_store(mut self, store: Box<dyn CurveStore>) -> Self {
        self.store = store;
        self
    }

    pub const fn curve(&self) -> &ExpCurve {
        &self.curve
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    /// Execute one command.
    pub fn handle(&mut self, cmd: Command) -> Result<(), StationError> {
        match cmd {
            Command::CalibrationBegin => {
                self.points.clear();
                tracing::info!("calibration started");
            }
            Command::CalibrationStorePoint(p) => {
                self.points.push(p);
                tracing::info!(x_ms = p.x, y_ms = p.y, n = self.points.len(), "point stored");
            }
            Command::CalibrationEnd => self.finish_calibration(),
            Command::CalibrationSave => self.save()?,
            Command::CalibrationLoad => self.load()?,
            Command::MotorDown => self.lower()?,
            Command::MotorUp => self.raise()?,
            Command::PourOneUnit => self.pour_one_unit()?,
        }
        Ok(())
    }

    /// Answer one query.
    pub fn answer(&mut self, req: Request) -> Result<Reply, StationError> {
        Ok(match req {
            Request::GetParam(p) => Reply::Param(self.curve.param(p)),
            Request::CalibrationIsValid(p) => Reply::Valid(self.is_valid_point(p)),
            Request::IsWaterPouring => Reply::Pouring(self.is_flowing()?),
        })
    }

    /// Whether `p` is plausible and not a repeat of a captured latency.
    pub fn is_valid_point(&self, p: SamplePoint) -> bool {
        let c = &self.cfg;
        let in_bounds = p.is_finite()
            && p.x >= c.min_x_ms
            && p.x <= c.max_x_ms
            && p.y > p.x
            && p.y <= c.max_y_ms;
        in_bounds && !self.points.iter().any(|q| (q.x - p.x).abs() < f64::EPSILON)
    }

    fn finish_calibration(&mut self) {
        if self.points.len() < 2 {
            tracing::warn!(
                n = self.points.len(),
                "not enough points to fit; keeping previous calibration"
            );
            return;
        }
        match self.curve.fit(&self.points) {
            Ok(()) => {
                let (a, b, c) = self.curve.params();
                tracing::info!(a, b, c, n = self.points.len(), "calibration fitted");
            }
            Err(e) => {
                tracing::warn!(error = %e, "fit failed; keeping previous calibration");
            }
        }
    }

    fn save(&mut self) -> Result<(), StationError> {
        if !self.curve.is_fitted() {
            tracing::warn!("nothing to save: station is not calibrated");
            return Ok(());
        }
        self.store
            .save(&self.curve)
            .map_err(|e| StationError::Storage(format!("{e:#}")))?;
        tracing::info!("calibration saved");
        Ok(())
    }

    fn load(&mut self) -> Result<(), StationError> {
        match self
            .store
            .load()
            .map_err(|e| StationError::Storage(format!("{e:#}")))?
        {
            Some(curve) => {
                let (a, b, c) = curve.params();
                self.curve.set_params(a, b, c);
                tracing::info!(a, b, c, "calibration loaded");
            }
            None => tracing::debug!("no saved calibration"),
        }
        Ok(())
    }

    fn lower(&mut self) -> Result<(), StationError> {
        self.motor.lower().map_err(|e| map_hw_error(e.as_ref()))
    }

    fn raise(&mut self) -> Result<(), StationError> {
        self.motor.raise().map_err(|e| map_hw_error(e.as_ref()))
    }

    fn is_flowing(&mut self) -> Result<bool, StationError> {
        self.flow.is_flowing().map_err(|e| map_hw_error(e.as_ref()))
    }

    /// Lower, wait for water, hold for the time the curve predicts, raise.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn pour_one_unit(&mut self) -> Result<(), StationError> {
        if !self.curve.is_fitted() {
            return Err(StationError::NotCalibrated);
        }
        let trigger = self.clock.now();
        self.lower()?;

        let limit_ms = self.cfg.max_x_ms.max(0.0) as u64;
        loop {
            match self.is_flowing() {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    let _ = self.raise();
                    return Err(e);
                }
            }
            let waited_ms = self.clock.ms_since(trigger);
            if waited_ms >= limit_ms {
                self.raise()?;
                tracing::warn!(waited_ms, "no water while pouring");
                return Err(StationError::NoFlow { waited_ms });
            }
            self.clock.sleep(self.cfg.flow_poll);
        }

        let x = self.clock.ms_since(trigger) as f64;
        let y = match self.curve.estimate(x) {
            Some(y) if y.is_finite() => y.clamp(x, self.cfg.max_y_ms.max(x)),
            _ => self.cfg.max_y_ms.max(x),
        };
        let elapsed = self.clock.ms_since(trigger) as f64;
        if y > elapsed {
            self.clock.sleep(Duration::from_millis((y - elapsed).round() as u64));
        }
        self.raise()?;
        tracing::info!(x_ms = x, hold_ms = y, "poured one unit");
        Ok(())
    }
}

impl<M: Motor, F: FlowSensor> MessageBus for Station<M, F> {
    fn send(&mut self, cmd: Command) -> Result<(), BusError> {
        tracing::trace!(?cmd, "bus send");
        self.handle(cmd).map_err(|e| Box::new(e) as BusError)
    }

    fn request(&mut self, req: Request) -> Result<Reply, BusError> {
        let reply = self.answer(req).map_err(|e| Box::new(e) as BusError)?;
        tracing::trace!(?req, ?reply, "bus request");
        Ok(reply)
    }
}
