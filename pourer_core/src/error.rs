use thiserror::Error;

use crate::bus::Reply;
use crate::curve::FitError;

/// Faults surfaced by the operator panel.
#[derive(Debug, Error, Clone)]
pub enum PanelError {
    #[error("message bus error: {0}")]
    Bus(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("unexpected reply to {expected}: {got:?}")]
    UnexpectedReply { expected: &'static str, got: Reply },
    #[error(transparent)]
    Station(#[from] StationError),
}

/// Faults surfaced by the station (actuator, flow sensor, calibration store).
#[derive(Debug, Error, Clone)]
pub enum StationError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("no water detected within {waited_ms} ms")]
    NoFlow { waited_ms: u64 },
    #[error("station is not calibrated")]
    NotCalibrated,
    #[error("calibration fit failed: {0}")]
    Fit(#[from] FitError),
    #[error("calibration storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing message bus")]
    MissingBus,
    #[error("missing display")]
    MissingDisplay,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
