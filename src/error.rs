// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the labeling engine
//!
//! The per-sample path never fails: unknown readings degrade to inactive
//! signals. Only empty inputs and unusable configuration are errors.

use thiserror::Error;

/// Result type alias for labeling operations
pub type Result<T> = std::result::Result<T, LabelerError>;

/// Main error type for labeling operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelerError {
    /// Calibration needs at least one historical sample
    #[error("Calibration set is empty")]
    EmptyCalibrationSet,

    /// A labeling run needs at least one sample
    #[error("Telemetry stream contains no samples")]
    EmptyStream,

    /// Configuration values the engine cannot run with
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
