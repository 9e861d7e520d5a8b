// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Rolling window store: bounded histories, baselines and dwell timers.
//!
//! [`EngineState`] holds everything that persists across a sample stream.
//! It is advanced exactly once per sample by [`EngineState::advance`], in a
//! fixed order, because later steps read what earlier steps just wrote.

use crate::config::{LabelerConfig, LightConfig, TimingConfig};
use crate::sample::TelemetrySample;
use crate::signals;
use std::collections::VecDeque;

/// Spacing between two samples, as credited to dwell timers.
///
/// Missing timestamps, clock glitches and long gaps all fall back to
/// `default_dt_secs`, so a single step can never satisfy a multi-second
/// dwell on its own. The first sample of a stream has no predecessor.
pub fn step_secs(prev_ts: Option<f64>, ts: f64, config: &TimingConfig) -> f64 {
    if let Some(prev) = prev_ts {
        if prev.is_finite() && ts.is_finite() {
            let dt = ts - prev;
            if dt >= config.min_dt_secs && dt <= config.max_dt_secs {
                return dt;
            }
        }
    }
    config.default_dt_secs
}

/// FIFO window holding at most `capacity` items.
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> BoundedWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest one on overflow.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<T> {
        self.items.front().copied()
    }

    pub fn newest(&self) -> Option<T> {
        self.items.back().copied()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter()
    }
}

/// A light level reading. Unknown lux is stored as 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightReading {
    pub ts: f64,
    pub lux: f64,
}

/// A barometric reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    pub ts: f64,
    pub hpa: f64,
}

/// Pressure readings pruned to a time horizon behind the newest entry.
#[derive(Debug, Clone)]
pub struct PressureHistory {
    readings: VecDeque<PressureReading>,
    horizon_secs: f64,
}

impl PressureHistory {
    pub fn new(horizon_secs: f64) -> Self {
        Self {
            readings: VecDeque::new(),
            horizon_secs,
        }
    }

    /// Append a reading and prune everything older than the horizon.
    /// Readings with an unknown time or value are ignored.
    pub fn push(&mut self, ts: f64, hpa: f64) -> bool {
        if !ts.is_finite() || !hpa.is_finite() {
            return false;
        }
        self.readings.push_back(PressureReading { ts, hpa });
        let cutoff = ts - self.horizon_secs;
        while self.readings.front().map_or(false, |r| r.ts < cutoff) {
            self.readings.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn oldest(&self) -> Option<PressureReading> {
        self.readings.front().copied()
    }

    pub fn newest(&self) -> Option<PressureReading> {
        self.readings.back().copied()
    }

    /// Oldest minus newest pressure (positive when falling).
    pub fn drop_hpa(&self) -> Option<f64> {
        match (self.oldest(), self.newest()) {
            (Some(old), Some(new)) => Some(old.hpa - new.hpa),
            _ => None,
        }
    }
}

/// Exponential moving average, unset until the first observation.
#[derive(Debug, Clone)]
pub struct EmaBaseline {
    value: Option<f64>,
    alpha: f64,
}

impl EmaBaseline {
    pub fn new(alpha: f64) -> Self {
        Self { value: None, alpha }
    }

    /// Fold in an observation.
    ///
    /// The first observation seeds the average and is then blended like any
    /// other, matching how the reference dataset was labeled.
    pub fn update(&mut self, x: f64) -> f64 {
        let base = self.value.unwrap_or(x);
        let next = (1.0 - self.alpha) * base + self.alpha * x;
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Accumulates time while a condition holds; any break resets it to zero.
#[derive(Debug, Clone, Default)]
pub struct DwellTimer {
    elapsed_secs: f64,
}

impl DwellTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, active: bool, dt: f64) -> f64 {
        if active {
            self.elapsed_secs += dt;
        } else {
            self.elapsed_secs = 0.0;
        }
        self.elapsed_secs
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn held_for(&self, secs: f64) -> bool {
        self.elapsed_secs >= secs
    }
}

/// Duration of an ongoing episode.
///
/// `None` means no episode; `Some(0.0)` is the first step of one. The first
/// step is not credited with `dt`.
#[derive(Debug, Clone, Default)]
pub struct OnsetTimer {
    elapsed_secs: Option<f64>,
}

impl OnsetTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, active: bool, dt: f64) -> Option<f64> {
        self.elapsed_secs = if active {
            Some(self.elapsed_secs.map_or(0.0, |e| e + dt))
        } else {
            None
        };
        self.elapsed_secs
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.elapsed_secs
    }
}

/// Day/night state with hysteresis between the night and day-on levels.
#[derive(Debug, Clone, Default)]
pub struct DayNight {
    is_day: bool,
    switched_at: Option<f64>,
}

impl DayNight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a light reading. Returns true on a transition.
    pub fn update(&mut self, lux: f64, ts: f64, config: &LightConfig) -> bool {
        if !lux.is_finite() {
            return false;
        }
        let switch = if self.is_day {
            lux < config.night_lux
        } else {
            lux > config.day_on_lux()
        };
        if switch {
            self.is_day = !self.is_day;
            self.switched_at = Some(ts);
        }
        switch
    }

    pub fn is_day(&self) -> bool {
        self.is_day
    }

    /// Timestamp of the last transition (may be non-finite).
    pub fn switched_at(&self) -> Option<f64> {
        self.switched_at
    }
}

/// All state carried across one sample stream.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) temps: BoundedWindow<f64>,
    pub(crate) light: BoundedWindow<LightReading>,
    pub(crate) pressure: PressureHistory,
    pub(crate) tds_baseline: EmaBaseline,
    pub(crate) tds_dwell: DwellTimer,
    pub(crate) dark_dwell: DwellTimer,
    pub(crate) disturbance: OnsetTimer,
    pub(crate) pump_on_at: Option<f64>,
    pub(crate) day_night: DayNight,
}

impl EngineState {
    pub fn new(config: &LabelerConfig) -> Self {
        Self {
            temps: BoundedWindow::new(config.thermal.cold_window_samples),
            light: BoundedWindow::new(config.light.window_capacity()),
            pressure: PressureHistory::new(config.pressure.history_secs),
            tds_baseline: EmaBaseline::new(config.tds.baseline_alpha),
            tds_dwell: DwellTimer::new(),
            dark_dwell: DwellTimer::new(),
            disturbance: OnsetTimer::new(),
            pump_on_at: None,
            day_night: DayNight::new(),
        }
    }

    /// Fold one sample into the state.
    ///
    /// `dt` comes from [`step_secs`], `z` is the calibrated microphone score.
    pub fn advance(&mut self, sample: &TelemetrySample, dt: f64, z: f64, config: &LabelerConfig) {
        let ts = sample.ts;

        // 1. pump-on edge
        if sample.pump {
            if self.pump_on_at.is_none() {
                self.pump_on_at = Some(if ts.is_finite() { ts } else { 0.0 });
            }
        } else {
            self.pump_on_at = None;
        }

        // 2. temperature window
        self.temps.push(sample.t_mid);

        // 3. TDS baseline
        if sample.tds_mv.is_finite() {
            self.tds_baseline.update(sample.tds_mv);
        }

        // 4. pressure history
        self.pressure.push(ts, sample.pressure_hpa);

        // 5. day/night
        if self.day_night.update(sample.lux, ts, &config.light) {
            log::debug!(
                "light switched to {} at ts={} (lux={})",
                if self.day_night.is_day() { "day" } else { "night" },
                ts,
                sample.lux
            );
        }

        // 6. light window
        let lux = if sample.lux.is_finite() { sample.lux } else { 0.0 };
        self.light.push(LightReading { ts, lux });

        // 7. dwell timers
        let tds_now =
            signals::tds_spike_instant(sample.tds_mv, self.tds_baseline.value(), &config.tds);
        self.tds_dwell.update(tds_now, dt);

        let dark_now = self.day_night.is_day()
            && signals::light_change(&self.light, config.light.sudden_window_secs)
                .map_or(false, |c| c.ratio_down <= config.light.sudden_dark_factor);
        self.dark_dwell.update(dark_now, dt);

        // 8. disturbance onset
        let masked = self.within_self_mask(ts, config.acoustic.pump_self_mask_secs);
        let ripple = signals::ripple(z, masked, &config.acoustic);
        self.disturbance.update(ripple, dt);
    }

    /// True while `ts` lies within `mask_secs` of the current pump-on edge.
    pub fn within_self_mask(&self, ts: f64, mask_secs: f64) -> bool {
        match self.pump_on_at {
            Some(on_at) if ts.is_finite() => ts - on_at < mask_secs,
            _ => false,
        }
    }

    pub fn temperature_window(&self) -> &BoundedWindow<f64> {
        &self.temps
    }

    pub fn light_window(&self) -> &BoundedWindow<LightReading> {
        &self.light
    }

    pub fn pressure_history(&self) -> &PressureHistory {
        &self.pressure
    }

    pub fn tds_baseline(&self) -> Option<f64> {
        self.tds_baseline.value()
    }

    pub fn tds_dwell_secs(&self) -> f64 {
        self.tds_dwell.elapsed_secs()
    }

    pub fn dark_dwell_secs(&self) -> f64 {
        self.dark_dwell.elapsed_secs()
    }

    pub fn disturbance_secs(&self) -> Option<f64> {
        self.disturbance.elapsed_secs()
    }

    pub fn pump_on_at(&self) -> Option<f64> {
        self.pump_on_at
    }

    pub fn is_day(&self) -> bool {
        self.day_night.is_day()
    }

    pub fn day_switched_at(&self) -> Option<f64> {
        self.day_night.switched_at()
    }
}
