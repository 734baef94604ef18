//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pourer", version, about = "Timed liquid dispenser")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/pourer.toml")]
    pub config: PathBuf,

    /// Log and print results as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the appliance, driving the front panel from stdin
    #[command(
        long_about = "Run the appliance, driving the front panel from stdin.\n\nOne command per line:\n  1 2 3 12 13 23 123   click the buttons (pressed together, then released)\n  p N / r N            press / release button N\n  tick                 run the scheduler now\n  wet / dry            turn the simulated water supply on / off\n  latency MS           set the simulated trigger-to-water delay\n  wait MS              pause the script\n  quit                 stop\n\nEvery screen change is printed."
    )]
    Run,
    /// Fit the exponential curve to captured points
    Fit {
        /// CSV with `x_ms,y_ms` headers
        #[arg(long, value_name = "FILE")]
        points: PathBuf,
        /// Also print the predicted hold time at these latencies (ms)
        #[arg(long, value_name = "X_MS")]
        at: Vec<f64>,
        /// Persist the fitted parameters to `calibration.file`
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
    },
    /// Validate the config and the stored calibration
    SelfCheck,
}
