//! Host loop feeding the panel from a channel of input events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use pourer_traits::ButtonInput;

use crate::bus::MessageBus;
use crate::error::Result;
use crate::input::{Button, Chord};
use crate::panel::Panel;
use crate::view::Display;

/// Something that happened at the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press(Button),
    Release(Button),
    /// Press every button of the chord, then release them all.
    Click(Chord),
    /// Force a scheduler tick now.
    Tick,
    Shutdown,
}

/// Run the panel until `Shutdown`, the input side hangs up, or `stop` is set.
///
/// Held buttons are sampled and the scheduler ticks at least every `tick`.
/// A failing event is logged and the loop carries on.
pub fn run<B: MessageBus, D: Display>(
    panel: &mut Panel<B, D>,
    events: &Receiver<InputEvent>,
    tick: Duration,
    stop: &AtomicBool,
) -> Result<()> {
    panel.begin()?;
    tracing::info!(mode = %panel.mode(), tick_ms = tick.as_millis(), "panel running");

    let mut last_idle = Instant::now();
    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::info!("stop requested");
            break;
        }
        let outcome = match events.recv_timeout(tick) {
            Ok(InputEvent::Shutdown) => break,
            Ok(InputEvent::Tick) => panel.tick(),
            Ok(ev) => apply(panel, ev),
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("input closed");
                break;
            }
        };
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "panel event failed");
        }

        if last_idle.elapsed() >= tick {
            last_idle = Instant::now();
            if let Err(e) = idle(panel) {
                tracing::warn!(error = %e, "panel tick failed");
            }
        }
    }

    if let Err(e) = panel.halt() {
        tracing::warn!(error = %e, "failed to raise straw on exit");
    }
    Ok(())
}

fn apply<B: MessageBus, D: Display>(panel: &mut Panel<B, D>, ev: InputEvent) -> Result<()> {
    match ev {
        InputEvent::Press(b) => panel.on_press(b),
        InputEvent::Release(b) => panel.on_release(b),
        InputEvent::Click(chord) => {
            let buttons: Vec<Button> = Button::ALL
                .into_iter()
                .filter(|b| chord.contains(*b))
                .collect();
            for b in &buttons {
                panel.on_press(*b)?;
            }
            for b in &buttons {
                panel.on_release(*b)?;
            }
            Ok(())
        }
        InputEvent::Tick => panel.tick(),
        InputEvent::Shutdown => Ok(()),
    }
}

/// Sample held buttons, then advance the scheduler.
fn idle<B: MessageBus, D: Display>(panel: &mut Panel<B, D>) -> Result<()> {
    let held: Vec<Button> = panel.held_buttons().collect();
    for b in held {
        panel.on_hold(b)?;
    }
    panel.tick()
}

/// Poll raw button levels and forward edges as events until `stop` is set
/// or the receiver hangs up.
pub fn forward_levels<I: ButtonInput>(
    input: &mut I,
    tx: &Sender<InputEvent>,
    period: Duration,
    stop: &AtomicBool,
) -> Result<()> {
    let mut last = [false; 3];
    while !stop.load(Ordering::Relaxed) {
        let levels = input
            .levels()
            .map_err(|e| eyre::eyre!("read buttons: {e}"))?;
        for b in Button::ALL {
            let (was, now) = (last[b.index()], levels[b.index()]);
            if was == now {
                continue;
            }
            let ev = if now {
                InputEvent::Press(b)
            } else {
                InputEvent::Release(b)
            };
            if tx.send(ev).is_err() {
                return Ok(());
            }
        }
        last = levels;
        std::thread::sleep(period);
    }
    Ok(())
}
