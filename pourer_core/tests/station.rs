//! Station behavior against the simulated rig, and a full calibration run
//! from button presses to a saved curve.

use std::sync::Arc;
use std::time::Duration;

use pourer_core::mocks::RecordingDisplay;
use pourer_core::{
    Button, Command, ExpCurve, FileCurveStore, MemoryCurveStore, MessageBus, Mode, Panel, Param,
    Reply, Request, SamplePoint, Station, StationCfg, StationError,
};
use pourer_hardware::{MotorEvent, SimHandle, SimulatedFlowSensor, SimulatedMotor, sim_rig};
use pourer_traits::clock::test_clock::TestClock;
use rstest::rstest;

type SimStation = Station<SimulatedMotor, SimulatedFlowSensor>;

fn station(cfg: StationCfg) -> (SimStation, SimHandle, TestClock) {
    let clock = TestClock::new();
    let shared: Arc<dyn pourer_traits::Clock + Send + Sync> = Arc::new(clock.clone());
    let (motor, flow, handle) = sim_rig(Arc::clone(&shared), Duration::from_millis(300));
    (Station::new(motor, flow, cfg, shared), handle, clock)
}

fn station_error<'a>(e: &'a (dyn std::error::Error + Send + Sync + 'static)) -> Option<&'a StationError> {
    e.downcast_ref::<StationError>()
}

#[rstest]
fn unfitted_station_reports_zero_params() {
    let (mut st, _, _) = station(StationCfg::default());
    for p in Param::ALL {
        assert_eq!(st.request(Request::GetParam(p)).unwrap(), Reply::Param(0.0));
    }
}

#[rstest]
#[case(SamplePoint::new(300.0, 3000.0), true)]
#[case(SamplePoint::new(0.5, 3000.0), false)]
#[case(SamplePoint::new(300.0, 300.0), false)]
#[case(SamplePoint::new(300.0, 250.0), false)]
#[case(SamplePoint::new(12_000.0, 20_000.0), false)]
#[case(SamplePoint::new(300.0, 70_000.0), false)]
#[case(SamplePoint::new(f64::NAN, 3000.0), false)]
fn point_validity_bounds(#[case] p: SamplePoint, #[case] valid: bool) {
    let (mut st, _, _) = station(StationCfg::default());
    assert_eq!(
        st.request(Request::CalibrationIsValid(p)).unwrap(),
        Reply::Valid(valid)
    );
}

#[rstest]
fn repeated_latency_is_rejected_until_capture_restarts() {
    let (mut st, _, _) = station(StationCfg::default());
    let p = SamplePoint::new(300.0, 3000.0);
    st.send(Command::CalibrationStorePoint(p)).unwrap();
    let again = SamplePoint::new(300.0, 3100.0);
    assert!(!st.is_valid_point(again));
    st.send(Command::CalibrationBegin).unwrap();
    assert!(st.points().is_empty());
    assert!(st.is_valid_point(again));
}

#[rstest]
fn end_with_too_few_points_keeps_previous_model() {
    let (st, _, _) = station(StationCfg::default());
    let mut st = st.with_store(Box::new(MemoryCurveStore::with_saved(ExpCurve::with_params(
        1.0, 2.0, 0.01,
    ))));
    st.send(Command::CalibrationLoad).unwrap();
    st.send(Command::CalibrationBegin).unwrap();
    st.send(Command::CalibrationStorePoint(SamplePoint::new(300.0, 3000.0)))
        .unwrap();
    st.send(Command::CalibrationEnd).unwrap();
    assert_eq!(st.curve().params(), (1.0, 2.0, 0.01));
}

#[rstest]
fn save_without_model_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curve.toml");
    let (st, _, _) = station(StationCfg::default());
    let mut st = st.with_store(Box::new(FileCurveStore::new(&path)));
    st.send(Command::CalibrationSave).unwrap();
    assert!(!path.exists());
}

#[rstest]
fn saved_curve_is_loaded_by_a_new_station() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curve.toml");

    let (st, _, _) = station(StationCfg::default());
    let mut st = st.with_store(Box::new(FileCurveStore::new(&path)));
    st.send(Command::CalibrationBegin).unwrap();
    for (x, y) in [(400.0, 3000.0), (500.0, 3300.0), (600.0, 3700.0), (700.0, 4200.0)] {
        st.send(Command::CalibrationStorePoint(SamplePoint::new(x, y)))
            .unwrap();
    }
    st.send(Command::CalibrationEnd).unwrap();
    st.send(Command::CalibrationSave).unwrap();
    let fitted = st.curve().params();

    let (fresh, _, _) = station(StationCfg::default());
    let mut fresh = fresh.with_store(Box::new(FileCurveStore::new(&path)));
    fresh.send(Command::CalibrationLoad).unwrap();
    assert_eq!(fresh.curve().params(), fitted);
}

#[rstest]
fn pour_holds_for_the_predicted_time() {
    let (st, handle, clock) = station(StationCfg::default());
    let mut st = st.with_store(Box::new(MemoryCurveStore::with_saved(ExpCurve::with_params(
        1000.0, 500.0, 0.002,
    ))));
    st.send(Command::CalibrationLoad).unwrap();
    st.send(Command::PourOneUnit).unwrap();

    assert_eq!(handle.events(), vec![MotorEvent::Lowered, MotorEvent::Raised]);
    // water after 300 ms; 1000 + 500·e^0.6 ≈ 1911 ms after the trigger
    assert_eq!(clock.elapsed(), Duration::from_millis(1911));
    assert_eq!(clock.sleeps().last(), Some(&Duration::from_millis(1611)));
}

#[rstest]
fn pour_without_water_raises_and_fails() {
    let cfg = StationCfg {
        max_x_ms: 500.0,
        ..StationCfg::default()
    };
    let (st, handle, _clock) = station(cfg);
    let mut st = st.with_store(Box::new(MemoryCurveStore::with_saved(ExpCurve::with_params(
        1000.0, 500.0, 0.002,
    ))));
    st.send(Command::CalibrationLoad).unwrap();
    handle.set_supply(false);

    let err = st.send(Command::PourOneUnit).unwrap_err();
    assert!(matches!(
        station_error(err.as_ref()),
        Some(StationError::NoFlow { waited_ms: 500 })
    ));
    assert!(!handle.is_lowered());
}

#[rstest]
fn pour_requires_calibration() {
    let (mut st, handle, _) = station(StationCfg::default());
    let err = st.send(Command::PourOneUnit).unwrap_err();
    assert!(matches!(
        station_error(err.as_ref()),
        Some(StationError::NotCalibrated)
    ));
    assert!(handle.events().is_empty());
}

#[rstest]
fn water_pouring_reflects_the_sensor() {
    let (mut st, _handle, clock) = station(StationCfg::default());
    st.send(Command::MotorDown).unwrap();
    assert_eq!(
        st.request(Request::IsWaterPouring).unwrap(),
        Reply::Pouring(false)
    );
    clock.advance(Duration::from_millis(300));
    assert_eq!(
        st.request(Request::IsWaterPouring).unwrap(),
        Reply::Pouring(true)
    );
}

#[rstest]
fn calibration_run_from_buttons_to_fitted_curve() {
    let (st, handle, clock) = station(StationCfg::default());
    let clock_box = Box::new(clock.clone());
    let mut panel = Panel::builder()
        .with_bus(st)
        .with_display(RecordingDisplay::new())
        .with_clock(clock_box)
        .build()
        .unwrap();
    panel.begin().unwrap();
    assert_eq!(panel.mode(), Mode::Calibration);

    // the reservoir drains: water takes longer to arrive each time
    let captures = [(400, 3000), (500, 3300), (600, 3700), (700, 4200), (800, 4900)];
    for (latency, release) in captures {
        handle.set_water_latency(Duration::from_millis(latency));
        panel.on_press(Button::Three).unwrap();
        let mut t = 0;
        while t < release {
            clock.advance(Duration::from_millis(10));
            t += 10;
            panel.on_hold(Button::Three).unwrap();
        }
        panel.on_release(Button::Three).unwrap();
    }
    assert_eq!(panel.bus().points().len(), 5);
    assert!(panel.memory().calibration.show_end);

    panel.on_press(Button::Two).unwrap();
    panel.on_release(Button::Two).unwrap();
    assert_eq!(panel.mode(), Mode::Calibrated);

    let curve = panel.bus().curve();
    assert!(curve.is_fitted());
    let y = curve.estimate(600.0).unwrap();
    assert!((y - 3700.0).abs() < 50.0, "estimate {y}");
}
