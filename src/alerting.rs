// UBi Guardian - Telemetry event labeling
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Helpers for the live alerting pipeline.
//!
//! These decide whether a sample is worth archiving or notifying about, and
//! summarize recent pump activity. Delivery itself happens elsewhere.

use crate::sample::TelemetrySample;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Default dedup interval for identical notifications.
pub const DEFAULT_DEDUP_SECS: f64 = 60.0;
/// Window over which pump duty is summed.
pub const DEFAULT_DUTY_WINDOW_SECS: f64 = 3600.0;
/// Pump duty above this (seconds per hour) is flagged.
pub const HIGH_DUTY_SECS: f64 = 1800.0;
/// Minimum age gap for judging a burst.
pub const DEFAULT_BURST_SPAN_SECS: f64 = 60.0;
/// Gradient change a burst must achieve.
pub const DEFAULT_BURST_MIN_DROP: f64 = 0.1;

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Alert,
    Recommendation,
    Info,
}

impl AlertKind {
    pub fn of(sample: &TelemetrySample) -> Self {
        if sample.alert {
            AlertKind::Alert
        } else if sample.rec_ms > 0 {
            AlertKind::Recommendation
        } else {
            AlertKind::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Alert => "alert",
            AlertKind::Recommendation => "rec",
            AlertKind::Info => "info",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Samples kept in the events archive.
pub fn is_event_worthy(sample: &TelemetrySample) -> bool {
    sample.alert || sample.rec_ms > 0
}

/// Samples that may trigger a notification (before dedup).
pub fn should_notify(sample: &TelemetrySample) -> bool {
    if is_event_worthy(sample) {
        return true;
    }
    !matches!(sample.reason.as_str(), "" | "none")
}

/// Identity of a notification for dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub kind: AlertKind,
    pub reason: String,
    pub context: String,
}

impl AlertKey {
    pub fn of(sample: &TelemetrySample) -> Self {
        Self {
            kind: AlertKind::of(sample),
            reason: sample.reason.clone(),
            context: sample.context.clone(),
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.kind, self.reason, self.context)
    }
}

/// Suppresses repeats of the same notification within a dedup interval.
#[derive(Debug, Clone)]
pub struct AlertGate {
    dedup_secs: f64,
    /// Last time each key was let through.
    last_sent: HashMap<AlertKey, f64>,
}

impl Default for AlertGate {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_SECS)
    }
}

impl AlertGate {
    pub fn new(dedup_secs: f64) -> Self {
        Self {
            dedup_secs,
            last_sent: HashMap::new(),
        }
    }

    /// Check and record a notification at `now`. Returns true if it may be
    /// sent; a suppressed attempt does not restart the interval.
    pub fn admit(&mut self, sample: &TelemetrySample, now: f64) -> bool {
        if !should_notify(sample) {
            return false;
        }
        let key = AlertKey::of(sample);
        if !self.cooled_down(&key, now) {
            log::debug!("suppressing duplicate notification {}", key);
            return false;
        }
        self.last_sent.insert(key, now);
        true
    }

    fn cooled_down(&self, key: &AlertKey, now: f64) -> bool {
        match self.last_sent.get(key) {
            Some(&last) => now - last >= self.dedup_secs,
            None => true,
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_sent.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PumpEntry {
    ts: f64,
    rec_ms: u64,
    dt_tb: f64,
}

/// Recent pump recommendations and stratification readings.
///
/// Entries older than the retention horizon behind the newest entry are
/// dropped, so a burst is judged against the oldest reading still retained.
#[derive(Debug, Clone)]
pub struct PumpLog {
    entries: VecDeque<PumpEntry>,
    retention_secs: f64,
}

impl Default for PumpLog {
    fn default() -> Self {
        Self::new(DEFAULT_DUTY_WINDOW_SECS)
    }
}

impl PumpLog {
    pub fn new(retention_secs: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            retention_secs,
        }
    }

    /// Record a sample. Samples without a timestamp are ignored.
    pub fn record(&mut self, sample: &TelemetrySample) {
        if !sample.ts.is_finite() {
            return;
        }
        self.entries.push_back(PumpEntry {
            ts: sample.ts,
            rec_ms: sample.rec_ms,
            dt_tb: sample.dt_tb,
        });
        let cutoff = sample.ts - self.retention_secs;
        while self.entries.front().map_or(false, |e| e.ts < cutoff) {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recommended pump seconds within `window_secs` before `now`.
    pub fn duty_secs(&self, now: f64, window_secs: f64) -> f64 {
        let ms: u64 = self
            .entries
            .iter()
            .filter(|e| e.rec_ms > 0 && now - e.ts <= window_secs)
            .map(|e| e.rec_ms)
            .sum();
        ms as f64 / 1000.0
    }

    pub fn is_high_duty(&self, now: f64) -> bool {
        self.duty_secs(now, DEFAULT_DUTY_WINDOW_SECS) > HIGH_DUTY_SECS
    }

    /// Whether pumping has moved the top-bottom gradient.
    ///
    /// Without enough history the burst is given the benefit of the doubt.
    pub fn burst_effective(&self, span_secs: f64, min_drop: f64) -> bool {
        let readings: Vec<&PumpEntry> =
            self.entries.iter().filter(|e| e.dt_tb.is_finite()).collect();
        if readings.len() < 2 {
            return true;
        }
        let newest = readings[readings.len() - 1];
        match readings.iter().find(|e| newest.ts - e.ts >= span_secs) {
            Some(start) => (newest.dt_tb - start.dt_tb).abs() >= min_drop,
            None => true,
        }
    }

    /// Short flags describing pump health, for notification bodies.
    pub fn notes(&self, now: f64) -> Vec<&'static str> {
        let mut notes = Vec::new();
        if self.is_high_duty(now) {
            notes.push("high_duty");
        }
        if !self.burst_effective(DEFAULT_BURST_SPAN_SECS, DEFAULT_BURST_MIN_DROP) {
            notes.push("ineffective_burst");
        }
        notes
    }
}

/// Dissolved-oxygen risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoBand {
    NotAvailable,
    Low,
    Medium,
    Safe,
}

impl DoBand {
    pub fn from_do_proxy(do_mg_l: f64) -> Self {
        if !do_mg_l.is_finite() {
            DoBand::NotAvailable
        } else if do_mg_l < 5.0 {
            DoBand::Low
        } else if do_mg_l < 7.0 {
            DoBand::Medium
        } else {
            DoBand::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DoBand::NotAvailable => "n/a",
            DoBand::Low => "low",
            DoBand::Medium => "medium",
            DoBand::Safe => "safe",
        }
    }
}
