//! Appliance assembly: station, panel, console LCD and input threads.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use pourer_config::Config;
use pourer_core::{
    CurveStore, FileCurveStore, InputEvent, MemoryCurveStore, Panel, PanelCfg, Station,
    StationCfg, runner,
};
use pourer_hardware::SimHandle;
use pourer_traits::{Clock, FlowSensor, MonotonicClock, Motor};

use crate::console::ConsoleLcd;
use crate::script;

fn store_for(cfg: &Config) -> Box<dyn CurveStore> {
    match cfg.calibration.file.as_deref() {
        Some(path) => Box::new(FileCurveStore::new(path)),
        None => {
            tracing::warn!("calibration.file not set; calibration is lost on exit");
            Box::new(MemoryCurveStore::new())
        }
    }
}

/// Read stdin on a background thread, feeding the panel and the rig.
fn spawn_stdin(
    tx: Sender<InputEvent>,
    sim: Option<SimHandle>,
    stop: Arc<AtomicBool>,
) -> eyre::Result<()> {
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin().lock();
            script::feed(stdin, &tx, sim.as_ref(), &stop);
            tracing::debug!("stdin closed");
        })
        .map_err(|e| eyre::eyre!("spawn stdin reader: {e}"))?;
    Ok(())
}

fn drive<M: Motor, F: FlowSensor>(
    motor: M,
    flow: F,
    cfg: &Config,
    clock: Arc<dyn Clock + Send + Sync>,
    rx: &Receiver<InputEvent>,
    json: bool,
    stop: &AtomicBool,
) -> eyre::Result<()> {
    let station = Station::new(motor, flow, StationCfg::from(cfg), Arc::clone(&clock))
        .with_store(store_for(cfg));
    let mut panel = Panel::builder()
        .with_bus(station)
        .with_display(ConsoleLcd::new(json))
        .with_cfg(PanelCfg::from(&cfg.panel))
        .with_shared_clock(clock)
        .build()?;
    runner::run(
        &mut panel,
        rx,
        Duration::from_millis(cfg.panel.tick_ms.max(1)),
        stop,
    )
}

/// Run until `quit`, end of input or Ctrl-C.
pub fn run_appliance(cfg: &Config, json: bool, stop: &Arc<AtomicBool>) -> eyre::Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let (tx, rx) = crossbeam_channel::unbounded();

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        use pourer_hardware::gpio::{GpioButtons, GpioFlowSensor, GpioMotor};

        let Some(pins) = cfg.pins.as_ref() else {
            eyre::bail!("missing [pins] section in config (required for hardware)");
        };
        let motor = GpioMotor::new(
            pins.motor_step,
            pins.motor_dir,
            pins.motor_en,
            cfg.motor.stroke_steps,
            cfg.motor.steps_per_sec,
        )
        .map_err(|e| eyre::eyre!("open motor pins: {e}"))?;
        let flow = GpioFlowSensor::new(pins.flow_sensor)
            .map_err(|e| eyre::eyre!("open flow sensor pin: {e}"))?;
        let mut buttons = GpioButtons::new([pins.button_1, pins.button_2, pins.button_3])
            .map_err(|e| eyre::eyre!("open button pins: {e}"))?;

        let button_tx = tx.clone();
        let button_stop = Arc::clone(stop);
        let period = Duration::from_millis(cfg.panel.tick_ms.max(1));
        std::thread::Builder::new()
            .name("buttons".into())
            .spawn(move || {
                if let Err(e) =
                    runner::forward_levels(&mut buttons, &button_tx, period, &button_stop)
                {
                    tracing::error!(error = %e, "button polling stopped");
                }
            })
            .map_err(|e| eyre::eyre!("spawn button poller: {e}"))?;
        spawn_stdin(tx, None, Arc::clone(stop))?;
        drive(motor, flow, cfg, clock, &rx, json, stop)
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let latency = Duration::from_millis(cfg.sim.water_latency_ms);
        let (motor, flow, handle) = pourer_hardware::sim_rig(Arc::clone(&clock), latency);
        tracing::info!(latency_ms = cfg.sim.water_latency_ms, "using simulated rig");
        spawn_stdin(tx, Some(handle), Arc::clone(stop))?;
        drive(motor, flow, cfg, clock, &rx, json, stop)
    }
}
