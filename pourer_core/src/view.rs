//! Operator modes, their remembered state and the render requests sent to the display.

use std::fmt;
use std::time::Instant;

use crate::curve::Param;

type DisplayError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Calibration,
    Message,
    Calibrated,
    SetUnits,
    SetStartAt,
    SetEvery,
    Automatic,
    ShowParamA,
    ShowParamB,
    ShowParamC,
    Unknown,
}

impl Mode {
    /// The parameter shown by a parameter view.
    pub const fn shown_param(self) -> Option<Param> {
        match self {
            Self::ShowParamA => Some(Param::A),
            Self::ShowParamB => Some(Param::B),
            Self::ShowParamC => Some(Param::C),
            _ => None,
        }
    }

    pub const fn show_param(p: Param) -> Self {
        match p {
            Param::A => Self::ShowParamA,
            Param::B => Self::ShowParamB,
            Param::C => Self::ShowParamC,
        }
    }

    pub const fn is_param_view(self) -> bool {
        self.shown_param().is_some()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Calibration => "calibration",
            Self::Message => "message",
            Self::Calibrated => "calibrated",
            Self::SetUnits => "set-units",
            Self::SetStartAt => "set-start-at",
            Self::SetEvery => "set-every",
            Self::Automatic => "automatic",
            Self::ShowParamA => "show-param-a",
            Self::ShowParamB => "show-param-b",
            Self::ShowParamC => "show-param-c",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationState {
    /// 1-based index of the point being captured.
    pub step: u8,
    /// Whether "End" is offered.
    pub show_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomaticState {
    pub units: u8,
    /// Minutes until the next dispense; `None` when no schedule is armed.
    pub remaining_min: Option<i64>,
    /// Start of the minute currently being counted down.
    pub anchor: Option<Instant>,
}

/// State remembered per mode for the life of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeMemory {
    pub calibration: CalibrationState,
    pub message: String,
    pub units: u8,
    pub start_at_min: u32,
    pub every_min: u32,
    pub automatic: AutomaticState,
}

impl Default for ModeMemory {
    fn default() -> Self {
        crate::config::PanelCfg::default().initial_memory()
    }
}

/// What the display should show; one variant per mode.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Calibration { step: u8, show_end: bool },
    Message { text: String },
    Calibrated,
    SetUnits { units: u8 },
    SetStartAt { minutes: u32 },
    SetEvery { minutes: u32 },
    Automatic { units: u8, remaining_min: Option<i64> },
    ShowParam { param: Param, value: f64 },
    Unknown,
}

impl View {
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Calibration { .. } => Mode::Calibration,
            Self::Message { .. } => Mode::Message,
            Self::Calibrated => Mode::Calibrated,
            Self::SetUnits { .. } => Mode::SetUnits,
            Self::SetStartAt { .. } => Mode::SetStartAt,
            Self::SetEvery { .. } => Mode::SetEvery,
            Self::Automatic { .. } => Mode::Automatic,
            Self::ShowParam { param, .. } => Mode::show_param(*param),
            Self::Unknown => Mode::Unknown,
        }
    }
}

/// Output device for render requests.
pub trait Display {
    fn show(&mut self, view: &View) -> Result<(), DisplayError>;
}

impl<T: Display + ?Sized> Display for &mut T {
    fn show(&mut self, view: &View) -> Result<(), DisplayError> {
        (**self).show(view)
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn show(&mut self, view: &View) -> Result<(), DisplayError> {
        (**self).show(view)
    }
}
