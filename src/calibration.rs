// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Microphone calibration pass.
//!
//! The microphone RMS level is normalized into a z-score against a frozen
//! `(median, population std)` pair computed once over a historical sample
//! set. The pair is never updated online.
//!
//! Because the statistic is taken over the whole set, labeling a dataset with
//! its own calibration peeks at future samples. That is fine for relabeling a
//! closed historical dataset. A live deployment must run the pass on a
//! separate historical set first and reuse the result.

use crate::error::{LabelerError, Result};
use crate::sample::TelemetrySample;
use serde::{Deserialize, Serialize};

/// Frozen microphone statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicCalibration {
    /// Median of finite RMS values.
    pub mu: f64,
    /// Population standard deviation of finite RMS values (never 0).
    pub sd: f64,
    /// Number of finite values the pair was computed from.
    pub count: usize,
}

impl MicCalibration {
    /// Use a known pair, e.g. from a previous deployment.
    pub fn new(mu: f64, sd: f64) -> Self {
        Self {
            mu,
            sd: usable_sd(sd),
            count: 0,
        }
    }

    /// Run the calibration pass over a historical sample set.
    pub fn from_samples(samples: &[TelemetrySample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(LabelerError::EmptyCalibrationSet);
        }
        let calibration = Self::from_values(samples.iter().map(|s| s.mic_rms));
        if calibration.count == 0 {
            log::warn!(
                "no finite micRMS among {} samples, calibrating with mu=0 sd=1",
                samples.len()
            );
        }
        log::debug!(
            "mic calibration: mu={:.4} sd={:.4} from {} values",
            calibration.mu,
            calibration.sd,
            calibration.count
        );
        Ok(calibration)
    }

    /// Compute the pair from raw RMS values; non-finite values are skipped.
    ///
    /// Values are sorted before any summation so the result does not depend
    /// on their order.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        finite.sort_by(f64::total_cmp);

        let mu = median(&finite).unwrap_or(0.0);
        let sd = if finite.len() > 1 {
            population_std(&finite)
        } else {
            1.0
        };

        Self {
            mu,
            sd: usable_sd(sd),
            count: finite.len(),
        }
    }

    /// Z-score of a microphone reading; unknown readings score 0.
    pub fn z_score(&self, mic_rms: f64) -> f64 {
        if mic_rms.is_finite() {
            (mic_rms - self.mu) / self.sd
        } else {
            0.0
        }
    }
}

fn usable_sd(sd: f64) -> f64 {
    if sd == 0.0 || !sd.is_finite() {
        1.0
    } else {
        sd
    }
}

/// Median of sorted values; the mean of the middle pair for even lengths.
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Population std by the corrected two-pass formula over compensated sums.
///
/// The reference labeling computed this with exact rational arithmetic. This
/// matches it to within an ulp or so, not bit for bit, so a z-score sitting
/// exactly on a threshold can still land on the other side.
fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = compensated_sum(values.iter().copied()) / n;
    let dev_sum = compensated_sum(values.iter().map(|v| v - mean));
    let sq_sum = compensated_sum(values.iter().map(|v| (v - mean) * (v - mean)));
    let variance = (sq_sum - dev_sum * dev_sum / n) / n;
    variance.max(0.0).sqrt()
}

/// Neumaier summation.
fn compensated_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0_f64;
    let mut carry = 0.0_f64;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            carry += (sum - t) + v;
        } else {
            carry += (v - t) + sum;
        }
        sum = t;
    }
    sum + carry
}
