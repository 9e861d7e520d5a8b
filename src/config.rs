// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Labeling engine configuration.
//!
//! Every default reproduces the thresholds the reviewed training dataset was
//! labeled with. Changing any of them changes historical labels.

use crate::error::{LabelerError, Result};
use serde::{Deserialize, Serialize};

/// Master configuration for the labeling engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    /// Sample spacing estimation.
    pub timing: TimingConfig,

    /// Water temperature thresholds.
    pub thermal: ThermalConfig,

    /// IR and air heat-source thresholds.
    pub heat: HeatSourceConfig,

    /// Light level thresholds and day/night hysteresis.
    pub light: LightConfig,

    /// Total-dissolved-solids spike detection.
    pub tds: TdsConfig,

    /// Barometric drop detection.
    pub pressure: PressureConfig,

    /// Microphone ripple, tap and disturbance detection.
    pub acoustic: AcousticConfig,
}

/// Largest accepted thermal window, in samples.
pub const MAX_COLD_WINDOW_SAMPLES: usize = 100_000;

/// Largest accepted light lookback (s).
pub const MAX_SUDDEN_WINDOW_SECS: f64 = 3600.0;

impl LabelerConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if !(t.min_dt_secs >= 0.0 && t.min_dt_secs <= t.max_dt_secs) {
            return Err(invalid(format!(
                "timing: min_dt_secs {} must be within [0, max_dt_secs {}]",
                t.min_dt_secs, t.max_dt_secs
            )));
        }
        if !(t.default_dt_secs > 0.0) {
            return Err(invalid("timing: default_dt_secs must be positive"));
        }
        let cold = self.thermal.cold_window_samples;
        if !(1..=MAX_COLD_WINDOW_SAMPLES).contains(&cold) {
            return Err(invalid(format!(
                "thermal: cold_window_samples {} must be in [1, {}]",
                cold, MAX_COLD_WINDOW_SAMPLES
            )));
        }
        if !(self.tds.baseline_alpha > 0.0 && self.tds.baseline_alpha <= 1.0) {
            return Err(invalid(format!(
                "tds: baseline_alpha {} must be in (0, 1]",
                self.tds.baseline_alpha
            )));
        }
        if !(self.pressure.history_secs > 0.0) {
            return Err(invalid("pressure: history_secs must be positive"));
        }
        let sudden = self.light.sudden_window_secs;
        if !(0.0..=MAX_SUDDEN_WINDOW_SECS).contains(&sudden) {
            return Err(invalid(format!(
                "light: sudden_window_secs {} must be in [0, {}]",
                sudden, MAX_SUDDEN_WINDOW_SECS
            )));
        }
        let a = &self.acoustic;
        if !(a.tap_min_secs <= a.tap_max_secs) {
            return Err(invalid(format!(
                "acoustic: tap_min_secs {} exceeds tap_max_secs {}",
                a.tap_min_secs, a.tap_max_secs
            )));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> LabelerError {
    LabelerError::InvalidConfig(msg.into())
}

/// Elapsed-time estimation between consecutive samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Smallest accepted spacing (s). Shorter gaps are treated as clock glitches.
    pub min_dt_secs: f64,
    /// Largest accepted spacing (s). Longer gaps (reboots) are not credited.
    pub max_dt_secs: f64,
    /// Spacing assumed when the measured one is rejected.
    pub default_dt_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_dt_secs: 0.2,
            max_dt_secs: 5.0,
            default_dt_secs: 1.0,
        }
    }
}

/// Water temperature thresholds (degC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Length of the mid-probe temperature window (samples).
    pub cold_window_samples: usize,
    /// Drop across the full window that counts as a cold shock.
    pub cold_shock_delta: f64,
    /// Top-minus-bottom gradient above which the column is stratified.
    pub stratified_gradient: f64,
    /// Gradient below which the column is inverted.
    pub inversion_gradient: f64,
    /// Mid temperature above which a uniform column is overheated.
    pub overheat_c: f64,
    /// Gradient magnitude under which the column counts as uniform.
    pub uniform_gradient_max: f64,
    /// Mid temperature at which the pump cools a hot tank.
    pub cooling_hot_c: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            cold_window_samples: 60,
            cold_shock_delta: -0.5,
            stratified_gradient: 1.0,
            inversion_gradient: -0.8,
            overheat_c: 30.0,
            uniform_gradient_max: 0.3,
            cooling_hot_c: 30.0,
        }
    }
}

/// Heat-source thresholds for lamps and ambient fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatSourceConfig {
    /// IR object-minus-ambient difference that marks a hot source.
    pub ir_delta_hot: f64,
    /// Absolute IR object temperature that marks a hot source.
    pub ir_abs_hot: f64,
    /// Air temperature that alone indicates fire.
    pub air_fire_abs: f64,
    /// Air temperature that indicates fire when the air is also dry.
    pub air_hot_t: f64,
    /// Relative humidity at or under which hot air counts as dry.
    pub air_hot_low_rh: f64,
}

impl Default for HeatSourceConfig {
    fn default() -> Self {
        Self {
            ir_delta_hot: 5.0,
            ir_abs_hot: 45.0,
            air_fire_abs: 50.0,
            air_hot_t: 40.0,
            air_hot_low_rh: 15.0,
        }
    }
}

/// Light thresholds (lux) and sudden-change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Below this the tank is at night.
    pub night_lux: f64,
    /// Day starts above `night_lux * max(2, day_on_factor)`.
    pub day_on_factor: f64,
    /// Direct glare level.
    pub glare_lux: f64,
    /// Brightening ratio that counts as a flashlight at night.
    pub sudden_light_factor: f64,
    /// Darkening ratio that counts as abrupt darkness by day.
    pub sudden_dark_factor: f64,
    /// Lookback used to pick the reference light level (s).
    pub sudden_window_secs: f64,
    /// How long darkness must persist before it is reported (s).
    pub sudden_hold_secs: f64,
}

impl LightConfig {
    /// Lux above which night switches to day.
    pub fn day_on_lux(&self) -> f64 {
        self.night_lux * self.day_on_factor.max(2.0)
    }

    /// Capacity of the light window.
    pub fn window_capacity(&self) -> usize {
        let needed = (self.sudden_window_secs.max(0.0) as usize).saturating_add(1);
        needed.max(5)
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            night_lux: 30.0,
            day_on_factor: 5.0,
            glare_lux: 2000.0,
            sudden_light_factor: 10.0,
            sudden_dark_factor: 0.2,
            sudden_window_secs: 3.0,
            sudden_hold_secs: 3.0,
        }
    }
}

/// TDS spike detection (mV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdsConfig {
    /// Minimum jump above baseline.
    pub jump_abs_mv: f64,
    /// Jump relative to baseline; the larger of the two applies.
    pub jump_frac: f64,
    /// How long the jump must persist (s).
    pub dwell_secs: f64,
    /// EMA smoothing constant of the baseline.
    pub baseline_alpha: f64,
}

impl Default for TdsConfig {
    fn default() -> Self {
        Self {
            jump_abs_mv: 200.0,
            jump_frac: 0.25,
            dwell_secs: 10.0,
            baseline_alpha: 0.01,
        }
    }
}

/// Barometric pressure drop detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Drop across the history that signals a front (hPa).
    pub drop_hpa: f64,
    /// History horizon (s).
    pub history_secs: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            drop_hpa: 6.0,
            history_secs: 3.0 * 3600.0,
        }
    }
}

/// Microphone-based tap and disturbance detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcousticConfig {
    /// Z-score at which the water surface counts as rippling.
    pub ripple_z: f64,
    /// Shortest ripple reported as a human tap (s).
    pub tap_min_secs: f64,
    /// Longest ripple reported as a human tap (s).
    pub tap_max_secs: f64,
    /// Ripple duration reported as a disturbance (s).
    pub disturbance_dwell_secs: f64,
    /// Ripples this soon after the pump starts are pump noise (s).
    pub pump_self_mask_secs: f64,
    /// Largest z-score still compatible with a calm tank.
    pub calm_z_max: f64,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            ripple_z: 1.0,
            tap_min_secs: 0.7,
            tap_max_secs: 2.0,
            disturbance_dwell_secs: 5.0,
            pump_self_mask_secs: 8.0,
            calm_z_max: 1.0,
        }
    }
}
