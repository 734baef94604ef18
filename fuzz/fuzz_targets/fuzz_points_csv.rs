#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Arbitrary CSV bytes either load as finite points or fail cleanly, and
    // whatever loads must fit or fail without panicking.
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }
    let Ok(rows) = pourer_config::load_points_csv(file.path()) else {
        return;
    };
    let points: Vec<pourer_core::SamplePoint> =
        rows.iter().map(pourer_core::SamplePoint::from).collect();
    let mut curve = pourer_core::ExpCurve::new();
    if curve.fit(&points).is_ok() {
        let _ = curve.estimate(points[0].x);
    }
});
