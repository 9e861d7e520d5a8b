// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # UBi Guardian - Telemetry Event Labeling
//!
//! Assigns every telemetry sample of an aquatic monitor a single event label
//! explaining why the pump did or did not run.
//!
//! ## Key Features
//!
//! - **Streaming**: one pass, samples in arrival order, no look-ahead
//! - **Dwell and hysteresis**: rolling windows, EMA baselines and timers
//! - **Deterministic**: priority-ordered rules over signals and the device's
//!   own `reason` annotation
//! - **Closed vocabulary**: exactly one of twelve labels per sample
//!
//! ## Quick Start
//!
//! ```rust
//! use ubi_guardian::{label_dataset, Label, LabelerConfig, TelemetrySample};
//!
//! let samples: Vec<TelemetrySample> = (0..3)
//!     .map(|i| TelemetrySample {
//!         lux: 12.0,
//!         mic_rms: 0.1,
//!         ..TelemetrySample::at(i as f64)
//!     })
//!     .collect();
//!
//! let dataset = label_dataset(&samples, LabelerConfig::default()).unwrap();
//! assert!(dataset.labels().all(|l| l == Label::Calm));
//! ```
//!
//! ## Modules
//!
//! - [`sample`]: Telemetry samples, raw records and the feature vector
//! - [`calibration`]: Microphone z-score calibration
//! - [`window`]: Rolling windows, baselines and dwell timers
//! - [`signals`]: Indicator derivation
//! - [`reason`]: Device reason annotation mapping
//! - [`decision`]: Label decision rules
//! - [`engine`]: Per-sample pipeline
//! - [`alerting`]: Notification and pump-duty helpers

pub mod alerting;
pub mod calibration;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod label;
pub mod reason;
pub mod sample;
pub mod signals;
pub mod window;

pub use alerting::{is_event_worthy, should_notify, AlertGate, AlertKind, DoBand, PumpLog};
pub use calibration::MicCalibration;
pub use config::{
    AcousticConfig, HeatSourceConfig, LabelerConfig, LightConfig, PressureConfig, TdsConfig,
    ThermalConfig, TimingConfig,
};
pub use engine::{label_dataset, label_dataset_with, LabelEngine, LabeledDataset, LabeledSample};
pub use error::{LabelerError, Result};
pub use label::{Label, LabelCounts};
pub use reason::{map_reason, ReasonCode};
pub use sample::{FeatureVector, RawRecord, SampleAdapter, TelemetrySample, FEATURE_NAMES};
pub use signals::SignalSet;
pub use window::EngineState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
