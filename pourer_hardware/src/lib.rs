//! Device backends for the pouring station.
//!
//! The simulated rig is always available and is what the CLI uses off-target.
//! The `hardware` feature adds rppal-backed GPIO buttons, flow sensor and a
//! step/dir straw actuator.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use pourer_traits::{ButtonInput, Clock, FlowSensor, Motor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Actuator movements observed by the simulated rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorEvent {
    Lowered,
    Raised,
}

#[derive(Debug)]
struct Rig {
    water_latency: Duration,
    supply: bool,
    lowered_at: Option<Instant>,
    events: Vec<MotorEvent>,
    levels: [bool; 3],
}

struct RigState {
    clock: Arc<dyn Clock + Send + Sync>,
    rig: Mutex<Rig>,
}

impl RigState {
    // A panic while holding the lock leaves plain data behind; keep using it.
    fn lock(&self) -> MutexGuard<'_, Rig> {
        self.rig.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flowing(&self) -> bool {
        let (at, latency, supply) = {
            let rig = self.lock();
            (rig.lowered_at, rig.water_latency, rig.supply)
        };
        let Some(at) = at else {
            return false;
        };
        let latency = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        supply && self.clock.ms_since(at) >= latency
    }
}

/// Build a simulated rig sharing one water model.
///
/// Water reaches the sensor `water_latency` after the straw is lowered, as
/// long as the supply is on. Time comes from `clock`, so a test clock gives
/// fully deterministic latencies. All parts are `Send` and may live on
/// different threads.
pub fn sim_rig(
    clock: Arc<dyn Clock + Send + Sync>,
    water_latency: Duration,
) -> (SimulatedMotor, SimulatedFlowSensor, SimHandle) {
    let state = Arc::new(RigState {
        clock,
        rig: Mutex::new(Rig {
            water_latency,
            supply: true,
            lowered_at: None,
            events: Vec::new(),
            levels: [false; 3],
        }),
    });
    (
        SimulatedMotor {
            state: Arc::clone(&state),
            travel: Duration::ZERO,
        },
        SimulatedFlowSensor {
            state: Arc::clone(&state),
        },
        SimHandle { state },
    )
}

/// Simulated straw actuator.
pub struct SimulatedMotor {
    state: Arc<RigState>,
    travel: Duration,
}

impl SimulatedMotor {
    /// Time each stroke takes; spent on the rig clock.
    pub fn with_travel(mut self, travel: Duration) -> Self {
        self.travel = travel;
        self
    }
}

impl Motor for SimulatedMotor {
    fn lower(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.state.clock.sleep(self.travel);
        let now = self.state.clock.now();
        let mut rig = self.state.lock();
        rig.lowered_at.get_or_insert(now);
        rig.events.push(MotorEvent::Lowered);
        tracing::debug!("straw lowered (simulated)");
        Ok(())
    }

    fn raise(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.state.clock.sleep(self.travel);
        let mut rig = self.state.lock();
        rig.lowered_at = None;
        rig.events.push(MotorEvent::Raised);
        tracing::debug!("straw raised (simulated)");
        Ok(())
    }
}

/// Simulated flow sensor driven by the rig's water model.
pub struct SimulatedFlowSensor {
    state: Arc<RigState>,
}

impl FlowSensor for SimulatedFlowSensor {
    fn is_flowing(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.state.flowing())
    }
}

/// Simulated front-panel buttons, set through `SimHandle::set_button`.
pub struct SimulatedButtons {
    state: Arc<RigState>,
}

impl ButtonInput for SimulatedButtons {
    fn levels(&mut self) -> Result<[bool; 3], Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.state.lock().levels)
    }
}

/// Control and inspection side of a simulated rig.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<RigState>,
}

impl SimHandle {
    /// Turn the water supply on or off. With the supply off the sensor
    /// never reports flow.
    pub fn set_supply(&self, on: bool) {
        self.state.lock().supply = on;
    }

    pub fn supply(&self) -> bool {
        self.state.lock().supply
    }

    pub fn set_water_latency(&self, latency: Duration) {
        self.state.lock().water_latency = latency;
    }

    pub fn water_latency(&self) -> Duration {
        self.state.lock().water_latency
    }

    pub fn is_lowered(&self) -> bool {
        self.state.lock().lowered_at.is_some()
    }

    /// Every actuator movement so far, oldest first.
    pub fn events(&self) -> Vec<MotorEvent> {
        self.state.lock().events.clone()
    }

    pub fn set_button(&self, index: usize, down: bool) {
        if let Some(l) = self.state.lock().levels.get_mut(index) {
            *l = down;
        }
    }

    /// Button source reading the levels set on this handle.
    pub fn buttons(&self) -> SimulatedButtons {
        SimulatedButtons {
            state: Arc::clone(&self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pourer_traits::clock::test_clock::TestClock;

    #[test]
    fn water_arrives_after_latency() {
        let clock = TestClock::new();
        let (mut motor, mut flow, handle) =
            sim_rig(Arc::new(clock.clone()), Duration::from_millis(300));
        assert!(!flow.is_flowing().unwrap());
        motor.lower().unwrap();
        clock.advance(Duration::from_millis(299));
        assert!(!flow.is_flowing().unwrap());
        clock.advance(Duration::from_millis(1));
        assert!(flow.is_flowing().unwrap());
        motor.raise().unwrap();
        assert!(!flow.is_flowing().unwrap());
        assert_eq!(handle.events(), vec![MotorEvent::Lowered, MotorEvent::Raised]);
    }

    #[test]
    fn dry_supply_never_flows() {
        let clock = TestClock::new();
        let (mut motor, mut flow, handle) = sim_rig(Arc::new(clock.clone()), Duration::ZERO);
        handle.set_supply(false);
        motor.lower().unwrap();
        clock.advance_minutes(1);
        assert!(!flow.is_flowing().unwrap());
    }

    #[test]
    fn travel_time_is_spent_on_the_rig_clock() {
        let clock = TestClock::new();
        let (motor, _flow, _handle) = sim_rig(Arc::new(clock.clone()), Duration::ZERO);
        let mut motor = motor.with_travel(Duration::from_millis(250));
        motor.lower().unwrap();
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
    }

    #[test]
    fn buttons_follow_handle_levels() {
        let clock = TestClock::new();
        let (_m, _f, handle) = sim_rig(Arc::new(clock), Duration::ZERO);
        let mut buttons = handle.buttons();
        handle.set_button(2, true);
        assert_eq!(buttons.levels().unwrap(), [false, false, true]);
        handle.set_button(7, true);
        assert_eq!(buttons.levels().unwrap(), [false, false, true]);
    }

    #[test]
    fn rig_parts_can_move_to_other_threads() {
        let clock = TestClock::new();
        let (mut motor, _flow, handle) = sim_rig(Arc::new(clock), Duration::ZERO);
        let worker = std::thread::spawn(move || {
            handle.set_supply(false);
            handle
        });
        let handle = worker.join().unwrap();
        motor.lower().unwrap();
        assert!(!handle.supply());
        assert!(handle.is_lowered());
    }
}
