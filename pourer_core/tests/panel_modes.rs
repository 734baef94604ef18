//! Mode navigation through chords, driven against a scripted bus.

use pourer_core::mocks::{RecordingDisplay, ScriptedBus};
use pourer_core::{Button, Chord, Command, Mode, Panel, Param, Request, View};
use pourer_traits::clock::test_clock::TestClock;
use rstest::rstest;

type TestPanel = Panel<ScriptedBus, RecordingDisplay>;

fn panel_with(bus: ScriptedBus) -> (TestPanel, TestClock) {
    let clock = TestClock::new();
    let p = Panel::builder()
        .with_bus(bus)
        .with_display(RecordingDisplay::new())
        .with_clock(Box::new(clock.clone()))
        .build()
        .unwrap();
    (p, clock)
}

fn calibrated_panel() -> TestPanel {
    let (mut p, _) = panel_with(ScriptedBus::calibrated(1000.0, 500.0, 0.002));
    p.begin().unwrap();
    p
}

fn click(p: &mut TestPanel, chord: Chord) {
    let buttons: Vec<Button> = Button::ALL
        .into_iter()
        .filter(|b| chord.contains(*b))
        .collect();
    for b in &buttons {
        p.on_press(*b).unwrap();
    }
    for b in &buttons {
        p.on_release(*b).unwrap();
    }
}

#[rstest]
fn begin_with_model_enters_calibrated() {
    let p = calibrated_panel();
    assert_eq!(p.mode(), Mode::Calibrated);
    assert_eq!(p.display().last(), Some(&View::Calibrated));
    assert_eq!(p.bus().count(&Command::CalibrationLoad), 0);
}

#[rstest]
fn begin_loads_saved_model_when_station_is_empty() {
    let (mut p, _) = panel_with(ScriptedBus::new().with_stored(1.0, 2.0, 3.0));
    p.begin().unwrap();
    assert_eq!(p.mode(), Mode::Calibrated);
    assert_eq!(p.bus().count(&Command::CalibrationLoad), 1);
    // three params before the load, three after
    let gets = p
        .bus()
        .requests
        .iter()
        .filter(|r| matches!(r, Request::GetParam(_)))
        .count();
    assert_eq!(gets, 6);
}

#[rstest]
fn begin_without_any_model_starts_calibration() {
    let (mut p, _) = panel_with(ScriptedBus::new());
    p.begin().unwrap();
    assert_eq!(p.mode(), Mode::Calibration);
    assert_eq!(
        p.bus().commands,
        vec![Command::CalibrationLoad, Command::CalibrationBegin]
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
fn schedule_setup_walks_to_automatic() {
    let mut p = calibrated_panel();

    click(&mut p, Chord::LEFT);
    assert_eq!(p.mode(), Mode::SetUnits);
    click(&mut p, Chord::MIDDLE);
    click(&mut p, Chord::MIDDLE);
    assert_eq!(p.display().last(), Some(&View::SetUnits { units: 3 }));

    click(&mut p, Chord::RIGHT);
    assert_eq!(p.mode(), Mode::SetStartAt);
    click(&mut p, Chord::MIDDLE);
    assert_eq!(p.display().last(), Some(&View::SetStartAt { minutes: 90 }));
    click(&mut p, Chord::LEFT);
    click(&mut p, Chord::LEFT);
    assert_eq!(p.display().last(), Some(&View::SetStartAt { minutes: 50 }));

    click(&mut p, Chord::RIGHT);
    assert_eq!(p.mode(), Mode::SetEvery);
    click(&mut p, Chord::MIDDLE);
    assert_eq!(p.display().last(), Some(&View::SetEvery { minutes: 90 }));

    click(&mut p, Chord::RIGHT);
    assert_eq!(p.mode(), Mode::Automatic);
    assert_eq!(
        p.display().last(),
        Some(&View::Automatic {
            units: 3,
            remaining_min: Some(50)
        })
    );
    assert!(p.memory().automatic.anchor.is_some());
}

#[rstest]
fn three_increments_from_one_select_four_units() {
    let mut p = calibrated_panel();
    click(&mut p, Chord::LEFT);
    assert_eq!(p.display().last(), Some(&View::SetUnits { units: 1 }));
    for _ in 0..3 {
        click(&mut p, Chord::MIDDLE);
    }
    assert_eq!(p.display().last(), Some(&View::SetUnits { units: 4 }));
}

#[rstest]
fn units_are_clamped_to_one_and_max() {
    let mut p = calibrated_panel();
    click(&mut p, Chord::LEFT);
    click(&mut p, Chord::LEFT);
    assert_eq!(p.memory().units, 1);
    for _ in 0..20 {
        click(&mut p, Chord::MIDDLE);
    }
    assert_eq!(p.memory().units, 9);
}

#[rstest]
fn cancelling_automatic_discards_countdown() {
    let mut p = calibrated_panel();
    for chord in [Chord::LEFT, Chord::RIGHT, Chord::RIGHT, Chord::RIGHT] {
        click(&mut p, chord);
    }
    assert_eq!(p.mode(), Mode::Automatic);
    click(&mut p, Chord::LEFT);
    assert_eq!(p.mode(), Mode::Calibrated);
    assert_eq!(p.memory().automatic.remaining_min, None);
    assert_eq!(p.memory().automatic.anchor, None);
}

#[rstest]
fn settings_survive_leaving_and_returning() {
    let mut p = calibrated_panel();
    click(&mut p, Chord::LEFT);
    click(&mut p, Chord::MIDDLE);
    click(&mut p, Chord::LEFT_MIDDLE);
    assert_eq!(p.mode(), Mode::ShowParamA);
    click(&mut p, Chord::LEFT);
    assert_eq!(p.mode(), Mode::Calibrated);
    click(&mut p, Chord::LEFT);
    assert_eq!(p.display().last(), Some(&View::SetUnits { units: 2 }));
}

#[rstest]
fn parameter_views_cycle_and_show_values() {
    let mut p = calibrated_panel();
    click(&mut p, Chord::LEFT_MIDDLE);
    assert_eq!(
        p.display().last(),
        Some(&View::ShowParam {
            param: Param::A,
            value: 1000.0
        })
    );
    click(&mut p, Chord::RIGHT);
    assert_eq!(p.mode(), Mode::ShowParamB);
    click(&mut p, Chord::RIGHT);
    assert_eq!(
        p.display().last(),
        Some(&View::ShowParam {
            param: Param::C,
            value: 0.002
        })
    );
    click(&mut p, Chord::RIGHT);
    assert_eq!(p.mode(), Mode::ShowParamA);
}

#[rstest]
fn left_middle_in_parameter_view_restarts_calibration() {
    let mut p = calibrated_panel();
    click(&mut p, Chord::LEFT_MIDDLE);
    p.bus_mut().clear_log();
    click(&mut p, Chord::LEFT_MIDDLE);
    assert_eq!(p.mode(), Mode::Calibration);
    assert_eq!(p.memory().calibration.step, 1);
    assert_eq!(p.bus().commands, vec![Command::CalibrationBegin]);
}

#[rstest]
fn calibrated_pour_and_raise_go_to_the_bus() {
    let mut p = calibrated_panel();
    p.bus_mut().clear_log();
    click(&mut p, Chord::MIDDLE);
    assert_eq!(p.bus().commands, vec![Command::PourOneUnit]);
    p.bus_mut().clear_log();
    // button 3 lowers on press and raises on release
    click(&mut p, Chord::RIGHT);
    assert_eq!(p.bus().commands, vec![Command::MotorDown, Command::MotorUp]);
    assert_eq!(p.mode(), Mode::Calibrated);
}

#[rstest]
fn unmapped_chord_changes_nothing() {
    let mut p = calibrated_panel();
    let rendered = p.display().views.len();
    p.bus_mut().clear_log();
    p.on_press(Button::One).unwrap();
    p.on_press(Button::Three).unwrap();
    p.on_release(Button::Three).unwrap();
    p.on_release(Button::One).unwrap();
    assert_eq!(p.mode(), Mode::Calibrated);
    assert_eq!(p.display().views.len(), rendered);
    // only the press edge of button 3 reached the bus
    assert_eq!(p.bus().commands, vec![Command::MotorDown]);
}

#[rstest]
fn repeated_press_is_a_hold_and_release_needs_a_press() {
    let mut p = calibrated_panel();
    p.bus_mut().clear_log();
    p.on_release(Button::Two).unwrap();
    assert_eq!(p.mode(), Mode::Calibrated);

    p.on_press(Button::One).unwrap();
    p.on_press(Button::One).unwrap();
    assert_eq!(p.held_buttons().collect::<Vec<_>>(), vec![Button::One]);
    assert!(p.bus().requests.contains(&Request::IsWaterPouring));
    p.on_release(Button::One).unwrap();
    assert_eq!(p.mode(), Mode::SetUnits);
}

#[rstest]
fn poll_turns_levels_into_edges() {
    let mut p = calibrated_panel();
    p.poll_levels([true, false, false]).unwrap();
    p.poll_levels([true, false, false]).unwrap();
    p.poll_levels([false, false, false]).unwrap();
    assert_eq!(p.mode(), Mode::SetUnits);
}

#[rstest]
fn bus_failure_surfaces_as_panel_error() {
    let mut p = calibrated_panel();
    p.bus_mut().fail_on = Some(Command::MotorUp);
    p.on_press(Button::Three).unwrap();
    let err = p.on_release(Button::Three).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<pourer_core::PanelError>(),
        Some(pourer_core::PanelError::Bus(_))
    ));
}
