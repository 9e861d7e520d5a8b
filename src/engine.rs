// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! LabelEngine - per-sample labeling pipeline.

use crate::calibration::MicCalibration;
use crate::config::LabelerConfig;
use crate::decision;
use crate::error::{LabelerError, Result};
use crate::label::{Label, LabelCounts};
use crate::reason::{self, ReasonCode};
use crate::sample::{FeatureVector, TelemetrySample};
use crate::signals::{self, SignalSet};
use crate::window::{self, EngineState};
use serde::Serialize;

/// Output for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: Label,
    /// Reason code the annotation mapped to.
    #[serde(serialize_with = "serialize_reason")]
    pub reason: ReasonCode,
    pub signals: SignalSet,
    /// Elapsed time credited to dwell timers for this step.
    pub dt: f64,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &ReasonCode,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(reason.as_str())
}

/// Streaming labeler for one sample sequence.
///
/// Samples must be fed in arrival order. State is never reset; start a new
/// engine for an independent stream.
pub struct LabelEngine {
    config: LabelerConfig,
    calibration: MicCalibration,
    state: EngineState,

    /// Timestamp of the previous sample, if any.
    prev_ts: Option<f64>,
    /// Total samples processed.
    sample_count: u64,
    counts: LabelCounts,
    last_label: Option<Label>,
}

impl LabelEngine {
    /// Create an engine with a frozen calibration.
    pub fn new(config: LabelerConfig, calibration: MicCalibration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: EngineState::new(&config),
            config,
            calibration,
            prev_ts: None,
            sample_count: 0,
            counts: LabelCounts::new(),
            last_label: None,
        })
    }

    /// Label the next sample.
    pub fn process(&mut self, sample: &TelemetrySample) -> LabeledSample {
        let dt = window::step_secs(self.prev_ts, sample.ts, &self.config.timing);
        self.prev_ts = Some(sample.ts);
        self.sample_count += 1;

        let z = self.calibration.z_score(sample.mic_rms);
        self.state.advance(sample, dt, z, &self.config);

        let signals = signals::derive(&self.state, sample, z, &self.config);
        let reason = reason::map_reason(&sample.reason);
        let label = decision::decide(sample, &signals, reason, &self.config);

        log::trace!(
            "sample {} ts={} dt={} signals={:?}",
            self.sample_count,
            sample.ts,
            dt,
            signals
        );
        if self.last_label != Some(label) {
            log::debug!(
                "label {} -> {} at ts={} (reason={:?})",
                self.last_label.map_or("start", |l| l.as_str()),
                label,
                sample.ts,
                reason.as_str()
            );
        }
        self.last_label = Some(label);
        self.counts.record(label);

        LabeledSample {
            features: sample.features(),
            label,
            reason,
            signals,
            dt,
        }
    }

    pub fn config(&self) -> &LabelerConfig {
        &self.config
    }

    pub fn calibration(&self) -> MicCalibration {
        self.calibration
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn counts(&self) -> &LabelCounts {
        &self.counts
    }

    pub fn last_label(&self) -> Option<Label> {
        self.last_label
    }
}

/// Result of labeling a closed dataset.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub calibration: MicCalibration,
    pub samples: Vec<LabeledSample>,
    pub counts: LabelCounts,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Labels in sample order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.samples.iter().map(|s| s.label)
    }
}

/// Calibrate on the dataset itself, then label it.
pub fn label_dataset(samples: &[TelemetrySample], config: LabelerConfig) -> Result<LabeledDataset> {
    if samples.is_empty() {
        return Err(LabelerError::EmptyStream);
    }
    let calibration = MicCalibration::from_samples(samples)?;
    label_dataset_with(samples, config, calibration)
}

/// Label a dataset with a calibration computed elsewhere.
pub fn label_dataset_with(
    samples: &[TelemetrySample],
    config: LabelerConfig,
    calibration: MicCalibration,
) -> Result<LabeledDataset> {
    if samples.is_empty() {
        return Err(LabelerError::EmptyStream);
    }
    let mut engine = LabelEngine::new(config, calibration)?;
    let labeled: Vec<LabeledSample> = samples.iter().map(|s| engine.process(s)).collect();
    log::debug!("labeled {} samples: {}", labeled.len(), engine.counts());
    Ok(LabeledDataset {
        calibration,
        samples: labeled,
        counts: engine.counts.clone(),
    })
}
