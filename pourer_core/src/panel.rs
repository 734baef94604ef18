//! Operator panel state machine.
//!
//! The panel turns button edges into chords, chords into mode transitions,
//! and drives the calibration capture and the automatic dispensing schedule.
//! Everything it needs from the outside world goes through the `MessageBus`
//! (curve parameters, point validation, actuator, flow sensor) and every
//! screen update is a `View` handed to the `Display`.
//!
//! The host calls `on_press` / `on_hold` / `on_release` (or `poll`) for each
//! button sample and `tick` periodically. All calls are synchronous.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pourer_traits::Clock;

use crate::bus::{Command, MessageBus, Reply, Request};
use crate::config::PanelCfg;
use crate::curve::{Param, SamplePoint};
use crate::error::{PanelError, Result};
use crate::hw_error::map_bus_error;
use crate::input::{Button, Chord, ChordTracker};
use crate::minutes;
use crate::util::{MILLIS_PER_MINUTE, whole_minutes};
use crate::view::{CalibrationState, Display, Mode, ModeMemory, View};

const NO_WATER: &str = "No Water!";
const INVALID_POINT: &str = "Invalid: retry!";

/// Timed waits the panel performs between renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Dwell on "Invalid: retry!" before returning to the capture screen.
    InvalidRetry,
    /// Gap between automatically dispensed units.
    PourSpacing,
}

/// Timing of the press currently (or last) held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CaptureSession {
    pressed_at: Instant,
    /// Trigger-to-water latency, once water has been seen during this hold.
    water_after_ms: Option<u64>,
}

pub struct Panel<B, D> {
    bus: B,
    display: D,
    cfg: PanelCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    mode: Mode,
    memory: ModeMemory,
    chords: ChordTracker,
    levels: [bool; 3],
    capture: Option<CaptureSession>,
}

impl<B: MessageBus, D: Display> Panel<B, D> {
    pub(crate) fn from_parts(
        bus: B,
        display: D,
        cfg: PanelCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let memory = cfg.initial_memory();
        Self {
            bus,
            display,
            cfg,
            clock,
            mode: Mode::Unknown,
            memory,
            chords: ChordTracker::new(),
            levels: [false; 3],
            capture: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn memory(&self) -> &ModeMemory {
        &self.memory
    }

    pub const fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub const fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub const fn cfg(&self) -> &PanelCfg {
        &self.cfg
    }

    /// Buttons currently believed to be down.
    pub fn held_buttons(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.levels[b.index()])
    }

    /// Trigger-to-water latency seen during the current hold, if any.
    pub fn water_latency_ms(&self) -> Option<u64> {
        self.capture.and_then(|c| c.water_after_ms)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Enter the initial mode: `Calibrated` when the station has (or can
    /// load) a non-zero model, `Calibration` otherwise.
    pub fn begin(&mut self) -> Result<()> {
        self.bootstrap()
    }

    /// Leave the hardware safe: straw up.
    pub fn halt(&mut self) -> Result<()> {
        self.send(Command::MotorUp)
    }

    fn bootstrap(&mut self) -> Result<()> {
        if self.params_all_zero()? {
            self.send(Command::CalibrationLoad)?;
            if self.params_all_zero()? {
                return self.set_mode(Mode::Calibration);
            }
        }
        self.set_mode(Mode::Calibrated)
    }

    fn params_all_zero(&mut self) -> Result<bool> {
        let mut all_zero = true;
        for p in Param::ALL {
            // every parameter is requested even after a non-zero one
            all_zero &= self.get_param(p)? == 0.0;
        }
        Ok(all_zero)
    }

    // ── Buttons ──────────────────────────────────────────────────────────────

    /// Button is down. The first call per physical press is the edge; repeated
    /// calls while held behave like `on_hold`.
    pub fn on_press(&mut self, b: Button) -> Result<()> {
        if self.levels[b.index()] {
            return self.on_hold(b);
        }
        self.levels[b.index()] = true;
        self.capture = Some(CaptureSession {
            pressed_at: self.clock.now(),
            water_after_ms: None,
        });
        self.chords.press(b);
        tracing::debug!(button = %b, mode = %self.mode, "press");

        if b == Button::Three && matches!(self.mode, Mode::Calibrated | Mode::Calibration) {
            self.send(Command::MotorDown)?;
        }
        Ok(())
    }

    /// Continuous sample for a held button: watch for water until it arrives.
    pub fn on_hold(&mut self, b: Button) -> Result<()> {
        if !self.levels[b.index()] {
            return Ok(());
        }
        let Some(session) = self.capture else {
            return Ok(());
        };
        if session.water_after_ms.is_some() {
            return Ok(());
        }
        if self.water_pouring()? {
            let ms = self.clock.ms_since(session.pressed_at);
            self.capture = Some(CaptureSession {
                water_after_ms: Some(ms),
                ..session
            });
            tracing::debug!(latency_ms = ms, "water detected");
        }
        Ok(())
    }

    /// Button is up. Dispatches the chord once every pressed button is released.
    pub fn on_release(&mut self, b: Button) -> Result<()> {
        if !self.levels[b.index()] {
            return Ok(());
        }
        self.levels[b.index()] = false;
        tracing::debug!(button = %b, "release");
        match self.chords.release(b) {
            Some(chord) => self.dispatch(chord),
            None => Ok(()),
        }
    }

    /// Feed one sampled level.
    pub fn poll(&mut self, b: Button, down: bool) -> Result<()> {
        if down {
            self.on_press(b)
        } else {
            self.on_release(b)
        }
    }

    /// Feed one sample of all three levels.
    pub fn poll_levels(&mut self, levels: [bool; 3]) -> Result<()> {
        for b in Button::ALL {
            self.poll(b, levels[b.index()])?;
        }
        Ok(())
    }

    fn dispatch(&mut self, chord: Chord) -> Result<()> {
        tracing::debug!(%chord, mode = %self.mode, "chord");

        if chord == Chord::LEFT_MIDDLE {
            if self.mode.is_param_view() {
                self.memory.calibration = CalibrationState {
                    step: 1,
                    show_end: false,
                };
                return self.set_mode(Mode::Calibration);
            }
            return self.set_mode(Mode::ShowParamA);
        }

        match (self.mode, chord) {
            (m, Chord::LEFT) if m.is_param_view() => self.bootstrap(),
            (m, Chord::RIGHT) if m.is_param_view() => {
                let next = m.shown_param().map_or(Param::A, Param::next);
                self.set_mode(Mode::show_param(next))
            }

            (Mode::Calibrated, Chord::LEFT) => self.set_mode(Mode::SetUnits),
            (Mode::Calibrated, Chord::MIDDLE) => self.send(Command::PourOneUnit),
            (Mode::Calibrated, Chord::RIGHT) => self.send(Command::MotorUp),

            (Mode::Calibration, Chord::LEFT) => self.set_mode(Mode::Calibrated),
            (Mode::Calibration, Chord::MIDDLE) => {
                self.send(Command::CalibrationEnd)?;
                self.send(Command::CalibrationSave)?;
                self.set_mode(Mode::Calibrated)
            }
            (Mode::Calibration, Chord::RIGHT) => self.capture_step(),

            (Mode::SetUnits, Chord::LEFT) => {
                self.memory.units = self.memory.units.saturating_sub(1).max(1);
                self.refresh()
            }
            (Mode::SetUnits, Chord::MIDDLE) => {
                self.memory.units = self.memory.units.saturating_add(1).min(self.cfg.max_units);
                self.refresh()
            }
            (Mode::SetUnits, Chord::RIGHT) => self.set_mode(Mode::SetStartAt),

            (Mode::SetStartAt, Chord::LEFT) => {
                self.memory.start_at_min = minutes::decrease(self.memory.start_at_min);
                self.refresh()
            }
            (Mode::SetStartAt, Chord::MIDDLE) => {
                self.memory.start_at_min = minutes::increase(self.memory.start_at_min);
                self.refresh()
            }
            (Mode::SetStartAt, Chord::RIGHT) => self.set_mode(Mode::SetEvery),

            (Mode::SetEvery, Chord::LEFT) => {
                self.memory.every_min = minutes::decrease(self.memory.every_min);
                self.refresh()
            }
            (Mode::SetEvery, Chord::MIDDLE) => {
                self.memory.every_min = minutes::increase(self.memory.every_min);
                self.refresh()
            }
            (Mode::SetEvery, Chord::RIGHT) => self.arm_schedule(),

            (Mode::Automatic, Chord::LEFT) => {
                self.memory.automatic.remaining_min = None;
                self.memory.automatic.anchor = None;
                tracing::info!("automatic schedule cancelled");
                self.set_mode(Mode::Calibrated)
            }

            (mode, chord) => {
                tracing::debug!(%chord, %mode, "unmapped chord ignored");
                Ok(())
            }
        }
    }

    // ── Calibration capture ──────────────────────────────────────────────────

    /// Turn the hold that just ended into a calibration point, or explain why not.
    fn capture_step(&mut self) -> Result<()> {
        let session = self.capture;
        let Some(latency_ms) = session.and_then(|s| s.water_after_ms) else {
            self.show_message(NO_WATER)?;
            // back to Calibration even when the raise failed
            let raised = self.send(Command::MotorUp);
            self.set_mode(Mode::Calibration)?;
            return raised;
        };
        let pressed_at = session.map_or_else(|| self.clock.now(), |s| s.pressed_at);

        #[allow(clippy::cast_precision_loss)]
        let point = SamplePoint::new(
            latency_ms as f64,
            self.clock.ms_since(pressed_at) as f64,
        );
        self.send(Command::MotorUp)?;

        if self.point_is_valid(point)? {
            self.send(Command::CalibrationStorePoint(point))?;
            let cal = &mut self.memory.calibration;
            cal.step = cal.step.saturating_add(1);
            if cal.step > self.cfg.min_steps_before_end {
                cal.show_end = true;
            }
            tracing::info!(x_ms = point.x, y_ms = point.y, step = cal.step, "calibration point accepted");
        } else {
            tracing::warn!(x_ms = point.x, y_ms = point.y, "calibration point rejected");
            self.show_message(INVALID_POINT)?;
            self.pause(Pause::InvalidRetry);
            self.set_mode(Mode::Calibration)?;
        }
        self.refresh()
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        self.memory.message.clear();
        self.memory.message.push_str(text);
        self.set_mode(Mode::Message)
    }

    // ── Automatic schedule ───────────────────────────────────────────────────

    fn arm_schedule(&mut self) -> Result<()> {
        let auto = &mut self.memory.automatic;
        auto.units = self.memory.units;
        auto.remaining_min = Some(i64::from(self.memory.start_at_min));
        auto.anchor = Some(self.clock.now());
        tracing::info!(
            units = auto.units,
            start_in_min = self.memory.start_at_min,
            every_min = self.memory.every_min,
            "automatic schedule armed"
        );
        self.set_mode(Mode::Automatic)
    }

    /// Periodic host call. Counts the schedule down in whole minutes and
    /// dispenses when it reaches zero; does nothing outside `Automatic`.
    pub fn tick(&mut self) -> Result<()> {
        if self.mode != Mode::Automatic {
            return Ok(());
        }
        let auto = self.memory.automatic;
        let (Some(remaining), Some(anchor)) = (auto.remaining_min, auto.anchor) else {
            return Ok(());
        };

        let passed = whole_minutes(self.clock.ms_since(anchor));
        let mut remaining = remaining;
        if passed > 0 {
            remaining = remaining.saturating_sub(passed);
            let advanced = u64::try_from(passed)
                .unwrap_or(u64::MAX)
                .saturating_mul(MILLIS_PER_MINUTE);
            self.memory.automatic.remaining_min = Some(remaining);
            let next_anchor = anchor
                .checked_add(Duration::from_millis(advanced))
                .unwrap_or_else(|| self.clock.now());
            self.memory.automatic.anchor = Some(next_anchor);
            self.refresh()?;
        }

        if remaining <= 0 {
            self.dispense()?;
        }
        Ok(())
    }

    fn dispense(&mut self) -> Result<()> {
        let units = self.memory.automatic.units;
        self.memory.automatic.anchor = Some(self.clock.now());
        tracing::info!(units, "automatic dispense");

        for _ in 0..units {
            // a failed pour must not stall the schedule
            if let Err(e) = self.send(Command::PourOneUnit) {
                tracing::warn!(error = %e, "automatic pour failed");
            }
            self.memory.automatic.units = self.memory.automatic.units.saturating_sub(1);
            if let Err(e) = self.refresh() {
                tracing::warn!(error = %e, "render during dispense failed");
            }
            self.pause(Pause::PourSpacing);
        }

        self.memory.automatic.remaining_min = Some(i64::from(self.memory.every_min));
        self.memory.automatic.units = units;
        self.refresh()
    }

    fn pause(&self, p: Pause) {
        let d = match p {
            Pause::InvalidRetry => self.cfg.invalid_retry,
            Pause::PourSpacing => self.cfg.pour_spacing,
        };
        tracing::trace!(pause = ?p, ms = d.as_millis(), "pause");
        self.clock.sleep(d);
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    /// Switch to `mode` and render it. Re-entering the current mode re-renders.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        if self.mode == Mode::Calibration && mode != Mode::Calibration && mode != Mode::Message {
            self.capture = None;
        }
        if mode == Mode::Calibration && self.memory.calibration.step == 1 {
            self.send(Command::CalibrationBegin)?;
        }

        let view = self.view_for(mode)?;
        tracing::trace!(?view, "render");
        self.display
            .show(&view)
            .map_err(|e| eyre::Report::new(PanelError::Display(e.to_string())))?;

        if self.mode != mode {
            tracing::info!(from = %self.mode, to = %mode, "mode change");
        }
        self.mode = mode;
        Ok(())
    }

    /// Re-render the current mode.
    pub fn refresh(&mut self) -> Result<()> {
        self.set_mode(self.mode)
    }

    fn view_for(&mut self, mode: Mode) -> Result<View> {
        let m = &self.memory;
        Ok(match mode {
            Mode::Calibration => View::Calibration {
                step: m.calibration.step,
                show_end: m.calibration.show_end,
            },
            Mode::Message => View::Message {
                text: m.message.clone(),
            },
            Mode::Calibrated => View::Calibrated,
            Mode::SetUnits => View::SetUnits { units: m.units },
            Mode::SetStartAt => View::SetStartAt {
                minutes: m.start_at_min,
            },
            Mode::SetEvery => View::SetEvery {
                minutes: m.every_min,
            },
            Mode::Automatic => View::Automatic {
                units: m.automatic.units,
                remaining_min: m.automatic.remaining_min,
            },
            Mode::ShowParamA | Mode::ShowParamB | Mode::ShowParamC => {
                let param = mode.shown_param().unwrap_or(Param::A);
                View::ShowParam {
                    param,
                    value: self.get_param(param)?,
                }
            }
            Mode::Unknown => View::Unknown,
        })
    }

    // ── Bus helpers ──────────────────────────────────────────────────────────

    fn send(&mut self, cmd: Command) -> Result<()> {
        tracing::trace!(?cmd, "send");
        self.bus
            .send(cmd)
            .map_err(|e| eyre::Report::new(map_bus_error(e.as_ref())))
    }

    fn request(&mut self, req: Request) -> Result<Reply> {
        self.bus
            .request(req)
            .map_err(|e| eyre::Report::new(map_bus_error(e.as_ref())))
    }

    fn get_param(&mut self, p: Param) -> Result<f64> {
        match self.request(Request::GetParam(p))? {
            Reply::Param(v) => Ok(v),
            got => Err(unexpected("GetParam", got)),
        }
    }

    fn point_is_valid(&mut self, point: SamplePoint) -> Result<bool> {
        match self.request(Request::CalibrationIsValid(point))? {
            Reply::Valid(v) => Ok(v),
            got => Err(unexpected("CalibrationIsValid", got)),
        }
    }

    fn water_pouring(&mut self) -> Result<bool> {
        match self.request(Request::IsWaterPouring)? {
            Reply::Pouring(v) => Ok(v),
            got => Err(unexpected("IsWaterPouring", got)),
        }
    }
}

fn unexpected(expected: &'static str, got: Reply) -> eyre::Report {
    eyre::Report::new(PanelError::UnexpectedReply { expected, got })
}
