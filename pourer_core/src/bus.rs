//! Typed messages between the panel and the station.
//!
//! The panel never touches the curve or the actuator directly; everything
//! goes through a `MessageBus`. Fire-and-forget work is a `Command`, queries
//! are a `Request` answered by exactly one `Reply`.

use crate::curve::{Param, SamplePoint};

type BusError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start a new capture: forget previously captured points.
    CalibrationBegin,
    /// Fit the curve from the captured points.
    CalibrationEnd,
    /// Persist the fitted parameters.
    CalibrationSave,
    /// Restore persisted parameters, if any.
    CalibrationLoad,
    CalibrationStorePoint(SamplePoint),
    MotorDown,
    MotorUp,
    /// Dispense one unit using the fitted curve.
    PourOneUnit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    GetParam(Param),
    CalibrationIsValid(SamplePoint),
    IsWaterPouring,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    Param(f64),
    Valid(bool),
    Pouring(bool),
}

pub trait MessageBus {
    fn send(&mut self, cmd: Command) -> Result<(), BusError>;
    fn request(&mut self, req: Request) -> Result<Reply, BusError>;
}

impl<T: MessageBus + ?Sized> MessageBus for &mut T {
    fn send(&mut self, cmd: Command) -> Result<(), BusError> {
        (**self).send(cmd)
    }
    fn request(&mut self, req: Request) -> Result<Reply, BusError> {
        (**self).request(req)
    }
}

impl<T: MessageBus + ?Sized> MessageBus for Box<T> {
    fn send(&mut self, cmd: Command) -> Result<(), BusError> {
        (**self).send(cmd)
    }
    fn request(&mut self, req: Request) -> Result<Reply, BusError> {
        (**self).request(req)
    }
}
