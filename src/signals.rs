// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Indicator signals derived from the current sample and the window store.
//!
//! Everything here is pure. Unknown (non-finite) readings make a predicate
//! false, they never count as zero.

use crate::config::{AcousticConfig, LabelerConfig, TdsConfig};
use crate::sample::TelemetrySample;
use crate::window::{BoundedWindow, EngineState, LightReading};
use serde::Serialize;

/// Named indicators, used by the decision rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    ColdShock,
    Stratified,
    Inversion,
    Glare,
    HeaterLamp,
    AmbientFire,
    OverheatUniform,
    TdsSpike,
    BaroDrop,
    FlashlightNight,
    AbruptDarkDay,
    HumanTap,
    Disturbance,
    CoolingHot,
    IsDay,
}

/// Indicators for one sample. Recomputed every step, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSet {
    pub cold_shock: bool,
    pub stratified: bool,
    pub inversion: bool,
    pub glare: bool,
    pub heater_lamp: bool,
    pub ambient_fire: bool,
    pub overheat_un: bool,
    /// TDS above baseline on this very sample.
    pub tds_spike_instant: bool,
    /// TDS above baseline for the full dwell.
    pub tds_spike: bool,
    pub baro_drop: bool,
    pub flashlight_night: bool,
    pub abrupt_dark_day: bool,
    pub human_tap: bool,
    pub disturbance: bool,
    pub cooling_hot: bool,
    pub is_day: bool,
    /// Calibrated microphone z-score (0 when unknown).
    pub z_score: f64,
}

impl SignalSet {
    pub fn get(&self, indicator: Indicator) -> bool {
        match indicator {
            Indicator::ColdShock => self.cold_shock,
            Indicator::Stratified => self.stratified,
            Indicator::Inversion => self.inversion,
            Indicator::Glare => self.glare,
            Indicator::HeaterLamp => self.heater_lamp,
            Indicator::AmbientFire => self.ambient_fire,
            Indicator::OverheatUniform => self.overheat_un,
            Indicator::TdsSpike => self.tds_spike,
            Indicator::BaroDrop => self.baro_drop,
            Indicator::FlashlightNight => self.flashlight_night,
            Indicator::AbruptDarkDay => self.abrupt_dark_day,
            Indicator::HumanTap => self.human_tap,
            Indicator::Disturbance => self.disturbance,
            Indicator::CoolingHot => self.cooling_hot,
            Indicator::IsDay => self.is_day,
        }
    }

    /// True if any of the indicators is set.
    pub fn any(&self, indicators: &[Indicator]) -> bool {
        indicators.iter().any(|i| self.get(*i))
    }
}

/// Light level change between the newest reading and a reference reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightChange {
    /// Newest over reference (999 when brightening from darkness).
    pub ratio_up: f64,
    /// Reference over newest (1 when the newest reading is dark).
    pub ratio_down: f64,
}

/// Compare the newest light reading against the one `lookback_secs` behind.
///
/// The reference is the first reading, walking back from the newest, that is
/// at least `lookback_secs` older; failing that, the oldest reading. An
/// unknown timestamp stops the walk at that reading. Needs two readings.
pub fn light_change(
    window: &BoundedWindow<LightReading>,
    lookback_secs: f64,
) -> Option<LightChange> {
    if window.len() < 2 {
        return None;
    }
    let newest = window.newest()?;
    let mut reference = newest;
    for reading in window.iter().rev() {
        reference = *reading;
        if !newest.ts.is_finite() || !reading.ts.is_finite() {
            break;
        }
        if newest.ts - reading.ts >= lookback_secs {
            break;
        }
    }

    let ratio_up = if reference.lux > 0.0 {
        newest.lux / reference.lux
    } else if newest.lux > 0.0 {
        999.0
    } else {
        1.0
    };
    let ratio_down = if newest.lux > 0.0 {
        reference.lux / newest.lux
    } else {
        1.0
    };

    Some(LightChange {
        ratio_up,
        ratio_down,
    })
}

/// TDS jumped above its baseline on this sample.
pub fn tds_spike_instant(tds_mv: f64, baseline: Option<f64>, config: &TdsConfig) -> bool {
    match baseline {
        Some(base) if tds_mv.is_finite() => {
            tds_mv - base > config.jump_abs_mv.max(config.jump_frac * base)
        }
        _ => false,
    }
}

/// The surface is rippling and the pump did not just start.
pub fn ripple(z: f64, within_self_mask: bool, config: &AcousticConfig) -> bool {
    z >= config.ripple_z && !within_self_mask
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Derive all indicators for `sample`, after the state has been advanced
/// with it.
pub fn derive(
    state: &EngineState,
    sample: &TelemetrySample,
    z_score: f64,
    config: &LabelerConfig,
) -> SignalSet {
    let thermal = &config.thermal;
    let heat = &config.heat;
    let light = &config.light;
    let acoustic = &config.acoustic;

    let t_mid = sample.t_mid;
    let dt_tb = sample.dt_tb;
    let lux = sample.lux;
    let (ir_obj, ir_amb) = (sample.ir_obj, sample.ir_amb);
    let (air_t, air_rh) = (sample.air_t, sample.air_rh);

    let temps = state.temperature_window();
    let cold_shock = match temps.oldest() {
        Some(oldest) if temps.is_full() && finite(&[t_mid, oldest]) => {
            t_mid - oldest <= thermal.cold_shock_delta
        }
        _ => false,
    };

    let stratified = dt_tb.is_finite() && dt_tb > thermal.stratified_gradient;
    let inversion = dt_tb.is_finite() && dt_tb < thermal.inversion_gradient;

    let glare = lux.is_finite() && lux >= light.glare_lux;
    let heater_lamp = glare
        && ((finite(&[ir_obj, ir_amb]) && ir_obj - ir_amb >= heat.ir_delta_hot)
            || (ir_obj.is_finite() && ir_obj >= heat.ir_abs_hot));

    let ambient_fire = (air_t.is_finite() && air_t >= heat.air_fire_abs)
        || (finite(&[air_t, air_rh]) && air_t >= heat.air_hot_t && air_rh <= heat.air_hot_low_rh);

    let overheat_un = t_mid.is_finite()
        && t_mid > thermal.overheat_c
        && dt_tb.is_finite()
        && dt_tb.abs() < thermal.uniform_gradient_max;

    let tds_now = tds_spike_instant(sample.tds_mv, state.tds_baseline(), &config.tds);
    let tds_spike = state.tds_dwell_secs() >= config.tds.dwell_secs;

    let baro_drop = state
        .pressure_history()
        .drop_hpa()
        .map_or(false, |drop| drop >= config.pressure.drop_hpa);

    let is_day = state.is_day();
    let flashlight_night = !is_day
        && light_change(state.light_window(), light.sudden_window_secs)
            .map_or(false, |c| c.ratio_up >= light.sudden_light_factor);
    let abrupt_dark_day = state.dark_dwell_secs() >= light.sudden_hold_secs;

    let (human_tap, disturbance) = match state.disturbance_secs() {
        Some(secs) => (
            !sample.pump && secs >= acoustic.tap_min_secs && secs <= acoustic.tap_max_secs,
            secs >= acoustic.disturbance_dwell_secs,
        ),
        None => (false, false),
    };

    let cooling_hot = t_mid.is_finite() && t_mid >= thermal.cooling_hot_c;

    SignalSet {
        cold_shock,
        stratified,
        inversion,
        glare,
        heater_lamp,
        ambient_fire,
        overheat_un,
        tds_spike_instant: tds_now,
        tds_spike,
        baro_drop,
        flashlight_night,
        abrupt_dark_day,
        human_tap,
        disturbance,
        cooling_hot,
        is_day,
        z_score,
    }
}
