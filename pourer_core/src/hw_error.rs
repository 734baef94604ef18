//! Maps `Box<dyn Error>` from trait boundaries to typed errors.
//!
//! The traits in `pourer_traits` and the `MessageBus`/`Display` seams use
//! `Box<dyn Error + Send + Sync>`; this module converts those to our typed
//! enums, with an optional feature-gated path for `pourer_hardware::HwError`
//! downcasting.

use crate::error::{PanelError, StationError};

/// Map an actuator or sensor error to a typed `StationError`.
///
/// Known hardware error types are downcast first; anything else keeps its
/// message as a `Hardware` fault.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> StationError {
    // Feature-gated: downcast to HwError to keep the pin detail without the prefix
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(pourer_hardware::error::HwError::Gpio(detail)) =
            e.downcast_ref::<pourer_hardware::error::HwError>()
        {
            return StationError::Hardware(format!("gpio {detail}"));
        }
    }

    if let Some(st) = e.downcast_ref::<StationError>() {
        return st.clone();
    }
    StationError::Hardware(e.to_string())
}

/// Map a message bus error to a typed `PanelError`.
///
/// Station faults travel through the bus boxed; they are recovered intact.
pub fn map_bus_error(e: &(dyn std::error::Error + 'static)) -> PanelError {
    if let Some(st) = e.downcast_ref::<StationError>() {
        return PanelError::Station(st.clone());
    }
    PanelError::Bus(e.to_string())
}
