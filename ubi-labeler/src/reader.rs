// UBi Labeler - Telemetry loading
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Telemetry loading from collector CSV exports and NDJSON logs.

use crate::error::{CliError, Result};
use clap::ValueEnum;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};
use ubi_guardian::{RawRecord, SampleAdapter, TelemetrySample};

/// On-disk telemetry layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Header row with collector field names.
    Csv,
    /// One JSON object per line.
    Ndjson,
}

impl InputFormat {
    /// Guess from the file extension; anything unknown is CSV.
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("ndjson") | Some("jsonl") => InputFormat::Ndjson,
            _ => InputFormat::Csv,
        }
    }
}

/// Load every sample of a telemetry file in file order.
///
/// A missing file and a file without samples are errors.
pub fn read_samples(path: &Path, format: Option<InputFormat>) -> Result<Vec<TelemetrySample>> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let format = format.unwrap_or_else(|| InputFormat::detect(path));
    debug!("reading {} as {:?}", path.display(), format);

    let samples = match format {
        InputFormat::Csv => read_csv(path)?,
        InputFormat::Ndjson => read_ndjson(path)?,
    };

    if samples.is_empty() {
        return Err(CliError::EmptyDataset(path.display().to_string()));
    }
    info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

fn read_csv(path: &Path) -> Result<Vec<TelemetrySample>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CliError::InvalidFormat("missing header row".to_string()));
    }

    let mut samples = Vec::new();
    for result in reader.records() {
        let record = result?;
        let raw: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.trim(), v))
            .collect();
        samples.push(raw.to_sample());
    }
    Ok(samples)
}

fn read_ndjson(path: &Path) -> Result<Vec<TelemetrySample>> {
    let reader = BufReader::new(File::open(path)?);
    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw = RawRecord::from_json(&line).map_err(|source| CliError::JsonLine {
            line: i + 1,
            source,
        })?;
        samples.push(raw.to_sample());
    }
    Ok(samples)
}
