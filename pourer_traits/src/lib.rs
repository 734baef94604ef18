//! Hardware seams shared by the controller, the station and the device backends.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Straw actuator. Both moves complete before returning.
pub trait Motor {
    fn lower(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn raise(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Water-flow sensor at the straw tip.
pub trait FlowSensor {
    fn is_flowing(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Raw levels of the three front-panel buttons, index 0 = leftmost.
pub trait ButtonInput {
    fn levels(&mut self) -> Result<[bool; 3], Box<dyn std::error::Error + Send + Sync>>;
}
