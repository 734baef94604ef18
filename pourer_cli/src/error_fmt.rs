//! Human-readable error descriptions and structured JSON error formatting.

use pourer_core::error::{BuildError, PanelError, StationError};
use pourer_core::FitError;

/// Stable name for the JSON `reason` field.
fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = err.downcast_ref::<StationError>() {
        return match se {
            StationError::NoFlow { .. } => "NoFlow",
            StationError::NotCalibrated => "NotCalibrated",
            StationError::Hardware(_) => "Hardware",
            StationError::Fit(_) => "FitFailed",
            StationError::Storage(_) => "Storage",
        };
    }
    if err.downcast_ref::<FitError>().is_some() {
        return "FitFailed";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidSetup";
    }
    "Error"
}

fn fit_help(fe: &FitError) -> String {
    match fe {
        FitError::NotEnoughPoints(n) => format!(
            "What happened: Only {n} calibration point(s) available.\nLikely causes: The CSV is too short.\nHow to fix: Capture at least five points with different water latencies."
        ),
        FitError::Singular { stage, .. } => format!(
            "What happened: The {stage} stage of the fit had no unique solution.\nLikely causes: Points too few, too close together, or lying on a straight line.\nHow to fix: Capture points over a wider range of water levels, then fit again."
        ),
        FitError::NonFinite => "What happened: The fit produced non-finite parameters.\nLikely causes: Extreme or inconsistent points.\nHow to fix: Remove outliers from the CSV and fit again.".to_string(),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBus => {
                "What happened: The panel was built without a station to talk to.\nLikely causes: Station construction failed or was not wired into the builder.\nHow to fix: Pass the station via with_bus(...).".to_string()
            }
            BuildError::MissingDisplay => {
                "What happened: The panel was built without a display.\nLikely causes: The LCD failed to initialize or was not wired into the builder.\nHow to fix: Pass a display via with_display(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [panel] section.\nHow to fix: Edit the config file, then rerun. See etc/pourer.toml for a sample."
            ),
        };
    }

    if let Some(fe) = err.downcast_ref::<FitError>() {
        return fit_help(fe);
    }

    if let Some(se) = err.downcast_ref::<StationError>() {
        return match se {
            StationError::NoFlow { waited_ms } => format!(
                "What happened: No water reached the sensor within {waited_ms} ms.\nLikely causes: Empty reservoir, kinked tube, or flow sensor not wired.\nHow to fix: Refill the reservoir, check the sensor, or raise calibration.max_x_ms."
            ),
            StationError::NotCalibrated => "What happened: Pour requested before calibration.\nLikely causes: No saved curve and no calibration run yet.\nHow to fix: Run a calibration (press buttons 1 and 2 together from the parameter view).".to_string(),
            StationError::Fit(fe) => fit_help(fe),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PanelError>() {
        return format!(
            "What happened: {pe}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'x_ms,y_ms'.".to_string();
    }

    if lower.contains("open motor pins")
        || lower.contains("open flow sensor pin")
        || lower.contains("open button pins")
    {
        return format!(
            "What happened: Failed to initialize hardware pins ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
        );
    }

    if lower.contains("read config") || lower.contains("parse config") {
        return format!(
            "What happened: Could not load the configuration.\nLikely causes: Wrong --config path or malformed TOML.\nHow to fix: Check the file and try again. Details: {msg}"
        );
    }

    if lower.contains(" must be ") || lower.contains("pins must be distinct") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values or reused pins.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 fit failed, 4 no water, 5 not calibrated, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "FitFailed" => 3,
        "NoFlow" => 4,
        "NotCalibrated" => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pourer_core::FitStage;

    #[test]
    fn fit_errors_get_their_own_exit_code() {
        let err = eyre::Report::new(FitError::Singular {
            stage: FitStage::Exponent,
            determinant: 0.0,
        });
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("no unique solution"));
    }

    #[test]
    fn station_errors_map_to_codes() {
        let err = eyre::Report::new(StationError::NoFlow { waited_ms: 900 });
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("900 ms"));
        let err = eyre::Report::new(StationError::NotCalibrated);
        assert_eq!(exit_code_for_error(&err), 5);
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let err = eyre::eyre!("calibration CSV must have headers 'x_ms,y_ms', got: raw,grams");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
        assert!(v["message"].as_str().unwrap().contains("x_ms,y_ms"));
        assert_eq!(exit_code_for_error(&err), 1);
    }
}
