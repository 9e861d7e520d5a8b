// UBi Labeler - Output writers
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Training CSV, signal dump and events archive.

use crate::error::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;
use ubi_guardian::alerting::{is_event_worthy, AlertKind, DoBand, PumpLog};
use ubi_guardian::{Label, LabeledDataset, LabeledSample, TelemetrySample, FEATURE_NAMES};

/// Format a float the way the reviewed training files were written:
/// `nan`, `inf`, `20.0`, `1e-05`, `1e+16`.
pub fn py_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let debug = format!("{:?}", v);
    match debug.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => debug,
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write the feature matrix with one label column.
pub fn write_training_csv(path: &Path, dataset: &LabeledDataset) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.push("label");
    writer.write_record(&header)?;

    for sample in &dataset.samples {
        let mut row: Vec<String> = sample.features.values().iter().map(|v| py_float(*v)).collect();
        row.push(sample.label.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    debug!("wrote {} training rows to {}", dataset.len(), path.display());
    Ok(())
}

#[derive(Serialize)]
struct SignalLine<'a> {
    ts: f64,
    #[serde(flatten)]
    labeled: &'a LabeledSample,
}

/// Dump every labeled sample with its signals, one JSON object per line.
pub fn write_signals(
    path: &Path,
    samples: &[TelemetrySample],
    dataset: &LabeledDataset,
) -> Result<()> {
    create_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    for (sample, labeled) in samples.iter().zip(&dataset.samples) {
        let line = SignalLine {
            ts: sample.ts,
            labeled,
        };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct EventLine<'a> {
    #[serde(flatten)]
    sample: &'a TelemetrySample,
    kind: AlertKind,
    label: Label,
    do_band: &'static str,
    extra: String,
}

/// Archive alerts and pump recommendations. Returns the number written.
pub fn write_events(
    path: &Path,
    samples: &[TelemetrySample],
    dataset: &LabeledDataset,
) -> Result<usize> {
    create_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    let mut pump_log = PumpLog::default();
    let mut written = 0;

    for (sample, labeled) in samples.iter().zip(&dataset.samples) {
        pump_log.record(sample);
        if !is_event_worthy(sample) {
            continue;
        }
        let line = EventLine {
            sample,
            kind: AlertKind::of(sample),
            label: labeled.label,
            do_band: DoBand::from_do_proxy(sample.do_proxy).as_str(),
            extra: pump_log.notes(sample.ts).join(","),
        };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    debug!("archived {} events to {}", written, path.display());
    Ok(written)
}
