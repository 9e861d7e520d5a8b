// UBi Labeler - Batch training-data labeler
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # UBi Labeler
//!
//! Turns recorded UBi Guardian telemetry into a labeled training set.
//!
//! ## Usage
//!
//! ```bash
//! # Label a collector CSV export
//! ubi-labeler --input data/telemetry.csv
//!
//! # Label an NDJSON log against a separate calibration set
//! ubi-labeler --input today.ndjson --calibration data/history.csv \
//!     --output data/today_training.csv --events data/today_events.ndjson
//! ```

mod error;
mod reader;
mod writer;

use clap::Parser;
use error::{CliError, Result};
use reader::InputFormat;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use ubi_guardian::{label_dataset_with, LabelerConfig, MicCalibration};

/// UBi Guardian telemetry labeler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Telemetry file to label (CSV or NDJSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Training CSV to write
    #[arg(short, long, default_value = "data/training.csv")]
    output: PathBuf,

    /// Input format (detected from the extension if omitted)
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,

    /// Historical telemetry for microphone calibration (defaults to the input)
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Labeler configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write every labeled sample with its signals (NDJSON)
    #[arg(long)]
    signals: Option<PathBuf>,

    /// Write alerts and pump recommendations (NDJSON)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("UBi Labeler v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LabelerConfig> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CliError::FileNotFound(path.display().to_string()),
                _ => CliError::Io(e),
            })?;
            LabelerConfig::from_json(&json).map_err(|source| CliError::Config {
                path: path.display().to_string(),
                source,
            })?
        }
        None => LabelerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let samples = reader::read_samples(&args.input, args.format)?;

    let calibration = match &args.calibration {
        Some(path) => {
            let history = reader::read_samples(path, None)?;
            MicCalibration::from_samples(&history)?
        }
        None => MicCalibration::from_samples(&samples)?,
    };
    info!(
        "Mic calibration: mu={:.4} sd={:.4} ({} values)",
        calibration.mu, calibration.sd, calibration.count
    );

    let dataset = label_dataset_with(&samples, config, calibration)?;

    writer::write_training_csv(&args.output, &dataset)?;
    if let Some(path) = &args.signals {
        writer::write_signals(path, &samples, &dataset)?;
        info!("Signals written to {}", path.display());
    }
    if let Some(path) = &args.events {
        let n = writer::write_events(path, &samples, &dataset)?;
        info!("{} events written to {}", n, path.display());
    }

    println!("OK: wrote {} rows={}", args.output.display(), dataset.len());
    println!("Label counts: {}", dataset.counts);
    Ok(())
}
