#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod console;
mod error_fmt;
mod fit;
mod run;
mod script;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use pourer_config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        tracing::error!(error = %format!("{e:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = pourer_config::load_file(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg)?;
    cfg.validate()?;
    tracing::debug!(config = ?cli.config, "config loaded");

    match cli.cmd {
        Commands::Run => {
            let stop = Arc::new(AtomicBool::new(false));
            let on_signal = Arc::clone(&stop);
            ctrlc::set_handler(move || on_signal.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            run::run_appliance(&cfg, cli.json, &stop)
        }
        Commands::Fit { points, at, save } => fit::run_fit(&cfg, &points, &at, save, cli.json),
        Commands::SelfCheck => self_check(&cfg, cli.json),
    }
}

fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let stored = match cfg.calibration.file.as_deref() {
        Some(file) => pourer_config::load_curve(Path::new(file))?,
        None => None,
    };
    let backend = if cfg!(all(feature = "hardware", target_os = "linux")) {
        "gpio"
    } else {
        "sim"
    };
    if json {
        let curve = stored.map(|c| serde_json::json!({ "a": c.a, "b": c.b, "c": c.c }));
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "backend": backend, "calibration": curve })
        );
    } else {
        println!("config ok (backend: {backend})");
        match stored {
            Some(c) => println!("calibrated: a={} b={} c={}", c.a, c.b, c.c),
            None => println!("not calibrated"),
        }
    }
    Ok(())
}

fn rotation(cfg: &Config) -> tracing_appender::rolling::Rotation {
    use tracing_appender::rolling::Rotation;
    match cfg.logging.rotation.as_deref() {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::NEVER,
    }
}

/// Console logs go to stderr (stdout carries screens and results); an
/// optional `[logging] file` receives JSON lines through a non-blocking writer.
fn init_tracing(json: bool, cli_level: &str, cfg: &Config) -> eyre::Result<()> {
    // RUST_LOG wins, then the config level, then --log-level.
    let level = cfg.logging.level.as_deref().unwrap_or(cli_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .boxed()
    };

    let file_layer = match cfg.logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
            let appender = tracing_appender::rolling::RollingFileAppender::new(rotation(cfg), dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
