//! Line-oriented panel script read from stdin.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use pourer_core::{Button, Chord, InputEvent};
use pourer_hardware::SimHandle;

/// One parsed script line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Input(InputEvent),
    Supply(bool),
    Latency(Duration),
    Wait(Duration),
}

fn button(arg: &str) -> eyre::Result<Button> {
    let n: u8 = arg
        .parse()
        .map_err(|_| eyre::eyre!("expected a button number, got {arg:?}"))?;
    Button::try_from(n).map_err(|n| eyre::eyre!("no button {n}; buttons are 1, 2 and 3"))
}

fn millis(arg: &str) -> eyre::Result<Duration> {
    arg.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| eyre::eyre!("expected milliseconds, got {arg:?}"))
}

fn chord(word: &str) -> Option<Chord> {
    if word.is_empty() || word.len() > 3 {
        return None;
    }
    let mut buttons = Vec::with_capacity(3);
    for ch in word.chars() {
        let b = ch
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .and_then(|d| Button::try_from(d).ok())?;
        if buttons.contains(&b) {
            return None;
        }
        buttons.push(b);
    }
    Some(Chord::of(&buttons))
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> eyre::Result<Option<Step>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        eyre::bail!("too many words in {line:?}");
    }
    let need = || arg.ok_or_else(|| eyre::eyre!("{head} needs an argument"));

    let step = match head {
        "p" | "press" => Step::Input(InputEvent::Press(button(need()?)?)),
        "r" | "release" => Step::Input(InputEvent::Release(button(need()?)?)),
        "tick" => Step::Input(InputEvent::Tick),
        "quit" | "exit" => Step::Input(InputEvent::Shutdown),
        "wet" => Step::Supply(true),
        "dry" => Step::Supply(false),
        "latency" => Step::Latency(millis(need()?)?),
        "wait" => Step::Wait(millis(need()?)?),
        other => match chord(other) {
            Some(c) if arg.is_none() => Step::Input(InputEvent::Click(c)),
            _ => eyre::bail!("unknown command {line:?}"),
        },
    };
    Ok(Some(step))
}

/// Read `input` to the end, forwarding panel events and applying rig
/// controls. Bad lines are logged and skipped.
///
/// Returning drops `tx`; once every sender is gone the runner stops.
pub fn feed<R: BufRead>(
    input: R,
    tx: &Sender<InputEvent>,
    sim: Option<&SimHandle>,
    stop: &Arc<AtomicBool>,
) {
    for (idx, line) in input.lines().enumerate() {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                return;
            }
        };
        let step = match parse_line(&line) {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "skipping script line");
                continue;
            }
        };
        match step {
            Step::Input(ev) => {
                if tx.send(ev).is_err() {
                    return;
                }
                if ev == InputEvent::Shutdown {
                    return;
                }
            }
            Step::Wait(d) => std::thread::sleep(d),
            Step::Supply(on) => match sim {
                Some(h) => {
                    h.set_supply(on);
                    tracing::info!(on, "water supply");
                }
                None => tracing::warn!("wet/dry only applies to the simulated rig"),
            },
            Step::Latency(d) => match sim {
                Some(h) => {
                    h.set_water_latency(d);
                    tracing::info!(latency_ms = d.as_millis(), "water latency");
                }
                None => tracing::warn!("latency only applies to the simulated rig"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Step::Input(InputEvent::Click(Chord::LEFT)))]
    #[case("12", Step::Input(InputEvent::Click(Chord::LEFT_MIDDLE)))]
    #[case("21", Step::Input(InputEvent::Click(Chord::LEFT_MIDDLE)))]
    #[case("  3  # next", Step::Input(InputEvent::Click(Chord::RIGHT)))]
    #[case("p 3", Step::Input(InputEvent::Press(Button::Three)))]
    #[case("release 1", Step::Input(InputEvent::Release(Button::One)))]
    #[case("tick", Step::Input(InputEvent::Tick))]
    #[case("quit", Step::Input(InputEvent::Shutdown))]
    #[case("dry", Step::Supply(false))]
    #[case("latency 450", Step::Latency(Duration::from_millis(450)))]
    #[case("wait 20", Step::Wait(Duration::from_millis(20)))]
    fn parses(#[case] line: &str, #[case] expected: Step) {
        assert_eq!(parse_line(line).unwrap(), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("# only a comment")]
    fn skips(#[case] line: &str) {
        assert_eq!(parse_line(line).unwrap(), None);
    }

    #[rstest]
    #[case("4")]
    #[case("11")]
    #[case("1234")]
    #[case("p")]
    #[case("p 7")]
    #[case("wait soon")]
    #[case("1 2")]
    #[case("pour")]
    fn rejects(#[case] line: &str) {
        assert!(parse_line(line).is_err(), "{line:?} should not parse");
    }

    #[test]
    fn feed_forwards_until_quit_and_drives_the_rig() {
        use pourer_traits::MonotonicClock;
        let (_m, _f, handle) = pourer_hardware::sim_rig(
            Arc::new(MonotonicClock::new()),
            Duration::from_millis(300),
        );
        let (tx, rx) = crossbeam_channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let script = "dry\nlatency 50\n1\nbogus\nquit\n2\n";
        feed(script.as_bytes(), &tx, Some(&handle), &stop);
        drop(tx);

        let events: Vec<InputEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![InputEvent::Click(Chord::LEFT), InputEvent::Shutdown]
        );
        assert!(!handle.supply());
        assert_eq!(handle.water_latency(), Duration::from_millis(50));
    }
}
