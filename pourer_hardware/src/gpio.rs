//! rppal-backed devices. Pins use BCM numbering.

use std::thread::sleep;
use std::time::Duration;

use pourer_traits::{ButtonInput, FlowSensor, Motor};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

fn gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))
}

fn output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    gpio.get(pin)
        .map(rppal::gpio::Pin::into_output_low)
        .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))
}

fn input_pullup(gpio: &Gpio, pin: u8) -> Result<InputPin> {
    gpio.get(pin)
        .map(rppal::gpio::Pin::into_input_pullup)
        .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))
}

/// Step/dir driver moving the straw a fixed stroke.
pub struct GpioMotor {
    step: OutputPin,
    dir: OutputPin,
    enable: Option<OutputPin>,
    stroke_steps: u32,
    half_period: Duration,
}

impl GpioMotor {
    pub fn new(
        step_pin: u8,
        dir_pin: u8,
        enable_pin: Option<u8>,
        stroke_steps: u32,
        steps_per_sec: u32,
    ) -> Result<Self> {
        let gpio = gpio()?;
        let step = output(&gpio, step_pin)?;
        let dir = output(&gpio, dir_pin)?;
        let enable = enable_pin.map(|p| output(&gpio, p)).transpose()?;
        let half_period = Duration::from_micros(500_000 / u64::from(steps_per_sec.max(1)));
        Ok(Self {
            step,
            dir,
            enable,
            stroke_steps,
            half_period,
        })
    }

    fn stroke(&mut self, down: bool) {
        if down {
            self.dir.set_high();
        } else {
            self.dir.set_low();
        }
        // A4988-style drivers enable on low.
        if let Some(en) = self.enable.as_mut() {
            en.set_low();
        }
        for _ in 0..self.stroke_steps {
            self.step.set_high();
            sleep(self.half_period);
            self.step.set_low();
            sleep(self.half_period);
        }
        if let Some(en) = self.enable.as_mut() {
            en.set_high();
        }
        trace!(down, steps = self.stroke_steps, "stroke done");
    }
}

impl Motor for GpioMotor {
    fn lower(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        debug!("lowering straw");
        self.stroke(true);
        Ok(())
    }

    fn raise(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        debug!("raising straw");
        self.stroke(false);
        Ok(())
    }
}

/// Conductive water probe; reads high when wet.
pub struct GpioFlowSensor {
    pin: InputPin,
}

impl GpioFlowSensor {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = gpio()?;
        let pin = gpio
            .get(pin)
            .map(rppal::gpio::Pin::into_input_pulldown)
            .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?;
        Ok(Self { pin })
    }
}

impl FlowSensor for GpioFlowSensor {
    fn is_flowing(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.pin.is_high())
    }
}

/// Three active-low push buttons with internal pull-ups.
pub struct GpioButtons {
    pins: [InputPin; 3],
}

impl GpioButtons {
    pub fn new(pins: [u8; 3]) -> Result<Self> {
        let gpio = gpio()?;
        let [a, b, c] = pins;
        Ok(Self {
            pins: [
                input_pullup(&gpio, a)?,
                input_pullup(&gpio, b)?,
                input_pullup(&gpio, c)?,
            ],
        })
    }
}

impl ButtonInput for GpioButtons {
    fn levels(&mut self) -> std::result::Result<[bool; 3], Box<dyn std::error::Error + Send + Sync>> {
        Ok([
            self.pins[0].is_low(),
            self.pins[1].is_low(),
            self.pins[2].is_low(),
        ])
    }
}
