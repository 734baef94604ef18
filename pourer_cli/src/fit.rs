//! Offline curve fitting from a CSV of captured points.

use std::path::Path;

use pourer_config::{Config, PersistedCurve};
use pourer_core::{ExpCurve, SamplePoint};

/// Fit the points in `csv`, print the parameters and any requested
/// estimates, and optionally persist the result.
pub fn run_fit(cfg: &Config, csv: &Path, at: &[f64], save: bool, json: bool) -> eyre::Result<()> {
    let rows = pourer_config::load_points_csv(csv)?;
    let points: Vec<SamplePoint> = rows.iter().map(SamplePoint::from).collect();

    let mut curve = ExpCurve::new();
    curve.fit(&points)?;
    let (a, b, c) = curve.params();
    tracing::info!(a, b, c, n = points.len(), "fitted");

    let estimates: Vec<(f64, f64)> = at
        .iter()
        .filter_map(|&x| curve.estimate(x).map(|y| (x, y)))
        .collect();

    let saved_to = if save {
        let Some(file) = cfg.calibration.file.as_deref() else {
            eyre::bail!("--save needs calibration.file in the config");
        };
        pourer_config::save_curve(Path::new(file), &PersistedCurve::from(&curve))?;
        tracing::info!(file, "calibration saved");
        Some(file)
    } else {
        None
    };

    if json {
        let estimates: Vec<_> = estimates
            .iter()
            .map(|(x, y)| serde_json::json!({ "x_ms": x, "y_ms": y }))
            .collect();
        let obj = serde_json::json!({
            "a": a,
            "b": b,
            "c": c,
            "points": points.len(),
            "estimates": estimates,
            "saved_to": saved_to,
        });
        println!("{obj}");
    } else {
        println!("a = {a:.6}");
        println!("b = {b:.6}");
        println!("c = {c:.9}");
        for (x, y) in &estimates {
            println!("y({x}) = {y:.1} ms");
        }
        if let Some(f) = saved_to {
            println!("saved to {f}");
        }
    }
    Ok(())
}
