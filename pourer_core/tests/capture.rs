//! Calibration capture step: press button 3, wait for water, release.

use std::collections::VecDeque;
use std::time::Duration;

use pourer_core::mocks::{RecordingDisplay, ScriptedBus};
use pourer_core::{Button, Command, Mode, Panel, SamplePoint, View};
use pourer_traits::clock::test_clock::TestClock;
use rstest::{fixture, rstest};

type TestPanel = Panel<ScriptedBus, RecordingDisplay>;

#[fixture]
fn uncalibrated() -> (TestPanel, TestClock) {
    let clock = TestClock::new();
    let mut p = Panel::builder()
        .with_bus(ScriptedBus::new())
        .with_display(RecordingDisplay::new())
        .with_clock(Box::new(clock.clone()))
        .build()
        .unwrap();
    p.begin().unwrap();
    p.bus_mut().clear_log();
    p.display_mut().views.clear();
    (p, clock)
}

/// Hold button 3 for `release_ms`, with water showing up at `water_ms` (if ever).
fn capture(p: &mut TestPanel, clock: &TestClock, water_ms: Option<u64>, release_ms: u64) {
    p.bus_mut().pouring = false;
    p.on_press(Button::Three).unwrap();
    let mut t = 0;
    while t < release_ms {
        clock.advance(Duration::from_millis(10));
        t += 10;
        p.bus_mut().pouring = water_ms.is_some_and(|w| t >= w);
        p.on_hold(Button::Three).unwrap();
    }
    p.on_release(Button::Three).unwrap();
}

#[rstest]
fn no_water_shows_message_and_keeps_step(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, clock) = uncalibrated;
    capture(&mut p, &clock, None, 2000);

    assert_eq!(p.mode(), Mode::Calibration);
    assert_eq!(p.memory().calibration.step, 1);
    assert_eq!(
        p.display().views,
        vec![
            View::Message {
                text: "No Water!".into()
            },
            View::Calibration {
                step: 1,
                show_end: false
            },
        ]
    );
    // step 1 re-entry restarts the capture on the station
    assert_eq!(
        p.bus().commands,
        vec![Command::MotorDown, Command::MotorUp, Command::CalibrationBegin]
    );
}

#[rstest]
fn valid_point_is_stored_and_step_advances(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, clock) = uncalibrated;
    capture(&mut p, &clock, Some(300), 3000);

    let point = SamplePoint::new(300.0, 3000.0);
    assert_eq!(
        p.bus().commands,
        vec![
            Command::MotorDown,
            Command::MotorUp,
            Command::CalibrationStorePoint(point)
        ]
    );
    assert_eq!(p.memory().calibration.step, 2);
    assert_eq!(
        p.display().last(),
        Some(&View::Calibration {
            step: 2,
            show_end: false
        })
    );
    assert!(clock.sleeps().is_empty());
}

#[rstest]
fn latency_is_taken_at_first_water_only(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, clock) = uncalibrated;
    capture(&mut p, &clock, Some(420), 2500);
    let stored: Vec<SamplePoint> = p
        .bus()
        .commands
        .iter()
        .filter_map(|c| match c {
            Command::CalibrationStorePoint(pt) => Some(*pt),
            _ => None,
        })
        .collect();
    assert_eq!(stored, vec![SamplePoint::new(420.0, 2500.0)]);
}

#[rstest]
fn invalid_point_shows_retry_and_dwells(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, clock) = uncalibrated;
    p.bus_mut().validity = VecDeque::from([false]);
    capture(&mut p, &clock, Some(300), 3000);

    assert_eq!(p.memory().calibration.step, 1);
    assert_eq!(p.bus().count(&Command::MotorUp), 1);
    assert!(
        !p.bus()
            .commands
            .iter()
            .any(|c| matches!(c, Command::CalibrationStorePoint(_)))
    );
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(1000)]);
    assert_eq!(
        p.display().views.first(),
        Some(&View::Message {
            text: "Invalid: retry!".into()
        })
    );
    assert_eq!(
        p.display().last(),
        Some(&View::Calibration {
            step: 1,
            show_end: false
        })
    );
}

#[rstest]
fn failed_raise_after_no_water_returns_to_capture_screen(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, _clock) = uncalibrated;
    p.bus_mut().fail_on = Some(Command::MotorUp);
    p.on_press(Button::Three).unwrap();
    assert!(p.on_release(Button::Three).is_err());

    assert_eq!(p.mode(), Mode::Calibration);
    assert_eq!(
        p.display().last(),
        Some(&View::Calibration {
            step: 1,
            show_end: false
        })
    );
}

#[rstest]
fn end_is_offered_after_five_points(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, clock) = uncalibrated;
    for i in 0..5u64 {
        capture(&mut p, &clock, Some(300 + 50 * i), 3000 + 200 * i);
        let cal = p.memory().calibration;
        assert_eq!(cal.show_end, i == 4, "after point {}", i + 1);
    }
    assert_eq!(
        p.display().last(),
        Some(&View::Calibration {
            step: 6,
            show_end: true
        })
    );
}

#[rstest]
fn end_fits_saves_and_returns_to_calibrated(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, _clock) = uncalibrated;
    p.on_press(Button::Two).unwrap();
    p.on_release(Button::Two).unwrap();
    assert_eq!(
        p.bus().commands,
        vec![Command::CalibrationEnd, Command::CalibrationSave]
    );
    assert_eq!(p.mode(), Mode::Calibrated);
}

#[rstest]
fn cancel_leaves_calibration(uncalibrated: (TestPanel, TestClock)) {
    let (mut p, _clock) = uncalibrated;
    p.on_press(Button::One).unwrap();
    p.on_release(Button::One).unwrap();
    assert_eq!(p.mode(), Mode::Calibrated);
    assert!(p.bus().commands.is_empty());
}
